//! Per-chat conversation state.
//!
//! The dialog is pure: it turns incoming events into actions and keeps
//! track of which chats are waiting for a city name. All I/O happens in
//! the runner.

use std::collections::HashSet;

use crate::client::ForecastLookup;
use crate::telegram::Update;

pub const START_COMMAND: &str = "start";
pub const START_DESCRIPTION: &str = "Запускает бота.";
pub const MENU_TEXT: &str = "Пожалуйста выберите:";
pub const FORECAST_BUTTON: &str = "Узнать погоду";
pub const FORECAST_CALLBACK: &str = "get_weather_forecast";
pub const ASK_CITY_TEXT: &str = "Пожалуйста, введите название города.";
pub const USAGE_TEXT: &str = "Отправьте /start чтобы получить список опций для запроса.";
pub const FAILURE_TEXT: &str = "Что-то пошло не так. Попробуйте еще раз.";

pub fn unknown_city_text(city: &str) -> String {
    format!(
        "Город '{}' не найден. Пожалуйста проверьте, правильно ли вы написали название города.",
        city
    )
}

/// Event the dialog reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Start {
        chat_id: i64,
    },
    Callback {
        chat_id: i64,
        message_id: i64,
        callback_id: String,
        data: String,
    },
    Text {
        chat_id: i64,
        text: String,
    },
}

impl Incoming {
    /// Classify an update. Commands other than `/start`, non-text messages
    /// and callbacks without a message are ignored.
    pub fn from_update(update: &Update) -> Option<Self> {
        if let Some(callback) = &update.callback_query {
            let message = callback.message.as_ref()?;
            return Some(Self::Callback {
                chat_id: message.chat.id,
                message_id: message.message_id,
                callback_id: callback.id.clone(),
                data: callback.data.clone().unwrap_or_default(),
            });
        }

        let message = update.message.as_ref()?;
        let text = message.text.as_deref()?;
        let chat_id = message.chat.id;

        match text.strip_prefix('/') {
            Some(command) => {
                let name = command
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .split('@')
                    .next()
                    .unwrap_or_default();
                (name == START_COMMAND).then_some(Self::Start { chat_id })
            }
            None => Some(Self::Text {
                chat_id,
                text: text.to_string(),
            }),
        }
    }
}

/// What the runner should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send the menu with the forecast button
    SendMenu { chat_id: i64 },
    AnswerCallback { callback_id: String },
    /// Replace the menu text with the city prompt
    EditText {
        chat_id: i64,
        message_id: i64,
        text: String,
    },
    /// Look up the forecast for `city` and reply with the result
    Forecast { chat_id: i64, city: String },
    SendText { chat_id: i64, text: String },
}

#[derive(Debug, Default)]
pub struct Dialog {
    awaiting_city: HashSet<i64>,
}

impl Dialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_awaiting_city(&self, chat_id: i64) -> bool {
        self.awaiting_city.contains(&chat_id)
    }

    pub fn handle(&mut self, event: Incoming) -> Vec<Action> {
        match event {
            Incoming::Start { chat_id } => vec![Action::SendMenu { chat_id }],
            Incoming::Callback {
                chat_id,
                message_id,
                callback_id,
                data,
            } => {
                let mut actions = vec![Action::AnswerCallback { callback_id }];
                if data == FORECAST_CALLBACK {
                    self.awaiting_city.insert(chat_id);
                    actions.push(Action::EditText {
                        chat_id,
                        message_id,
                        text: ASK_CITY_TEXT.to_string(),
                    });
                }
                actions
            }
            Incoming::Text { chat_id, text } => {
                if self.awaiting_city.remove(&chat_id) {
                    vec![Action::Forecast {
                        chat_id,
                        city: text.trim().to_string(),
                    }]
                } else {
                    vec![Action::SendText {
                        chat_id,
                        text: USAGE_TEXT.to_string(),
                    }]
                }
            }
        }
    }
}

/// Reply for a lookup that did not produce a forecast.
///
/// Returns `None` for [`ForecastLookup::Found`]; that case needs a summary.
pub fn lookup_reply(city: &str, lookup: &ForecastLookup) -> Option<String> {
    match lookup {
        ForecastLookup::Found(_) => None,
        ForecastLookup::UnknownCity => Some(unknown_city_text(city)),
        ForecastLookup::Failed => Some(FAILURE_TEXT.to_string()),
    }
}

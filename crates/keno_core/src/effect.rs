use crate::FailureReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Tell observers that the run reached a terminal phase.
    Notify(Notification),
}

/// User-facing message produced once per terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Completed {
        total: Option<u64>,
        received: usize,
    },
    Failed {
        reason: FailureReason,
    },
}

impl Notification {
    pub fn title(&self) -> &'static str {
        match self {
            Notification::Completed { .. } => "Парсинг завершён",
            Notification::Failed { .. } => "Ошибка",
        }
    }

    /// Failures share one generic description; the reason is only for logs.
    pub fn description(&self) -> String {
        match self {
            Notification::Completed { total, received } => {
                let count = total.unwrap_or(*received as u64);
                format!("Извлечено {count} тиражей")
            }
            Notification::Failed { .. } => "Не удалось получить данные с сервера".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notification::Failed { .. })
    }
}

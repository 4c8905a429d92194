//! User-facing strings. The application serves Ukrainian-speaking pet
//! owners, so everything a client may show verbatim is Ukrainian;
//! diagnostic messages inside error logs stay English.

pub const UNSUPPORTED_MEDIA_TYPE: &str =
    "Непідтримуваний тип файлу. Підтримуються: JPEG, PNG, WebP, PDF";

pub const DOCUMENT_DATA_REQUIRED: &str = "Потрібні дані документа";

pub const DOCUMENT_EMPTY: &str = "Документ не містить вмісту для розпізнавання";

pub const EXTRACTION_UNPARSABLE: &str = "Не вдалося розібрати результати розпізнавання";

pub const OCR_NOT_CONFIGURED: &str =
    "Сервіс сканування не налаштовано. Додайте OPENAI_API_KEY, щоб увімкнути розпізнавання документів.";

pub const CHAT_NOT_CONFIGURED: &str =
    "Сервіс AI-асистента не налаштовано. Додайте OPENAI_API_KEY, щоб увімкнути чат.";

pub const EXTRACTION_SERVICE_DOWN: &str =
    "Сервіс розпізнавання тимчасово недоступний. Спробуйте пізніше.";

pub const MESSAGE_REQUIRED: &str = "Повідомлення не може бути порожнім";

pub fn invalid_metric_value(metric_name: &str) -> String {
    format!("Невірне числове значення метрики \"{metric_name}\"")
}

pub const EMAIL_TAKEN: &str = "Ця електронна адреса вже зареєстрована";

pub mod education;
pub mod experience;
pub mod health;
pub mod portfolio;
pub mod profile;
pub mod users;

use serde::Serialize;

/// `{ success, data: [...] }`
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `{ success, message?, data }`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }

    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }
}

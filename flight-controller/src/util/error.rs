use core::fmt::{self, Debug, Display, Formatter};

#[derive(Debug)]
pub struct AppError<E> {
    pub message: &'static str,
    pub error: E,
}

impl<E> AppError<E> {
    pub fn new(message: &'static str, error: E) -> Self {
        Self { message, error }
    }
}

impl<E> Display for AppError<E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} {:?}", self.message, self.error)
    }
}

impl<E: Debug> std::error::Error for AppError<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_message_and_cause() {
        let error = AppError::new("Failed to store the config", std::io::ErrorKind::NotFound);
        assert_eq!(error.to_string(), "Failed to store the config NotFound");
    }
}

//! Operator notification port trait.

use crate::domain::error::SolidQuantError;

pub trait NotifierPort {
    fn send_message(&self, text: &str) -> Result<(), SolidQuantError>;

    /// Urgent notice: circuit-breaker trips and cycle failures.
    fn send_alert(&self, text: &str) -> Result<(), SolidQuantError>;
}

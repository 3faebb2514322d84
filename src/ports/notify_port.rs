//! Operator notification port trait.

use crate::domain::error::SigtraderError;

pub trait Notifier: Send + Sync {
    fn send(&self, text: &str) -> Result<(), SigtraderError>;
}

//! Notifier that writes alerts to the log. Used when no chat transport is
//! configured.

use crate::domain::error::SigtraderError;
use crate::ports::notify_port::Notifier;
use log::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, text: &str) -> Result<(), SigtraderError> {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            info!("[alert] {}", line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_always_succeeds() {
        assert!(LogNotifier.send("BUY signal for TCS.NS").is_ok());
        assert!(LogNotifier.send("").is_ok());
    }
}

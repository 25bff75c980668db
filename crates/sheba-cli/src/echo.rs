//! Incremental printing of a streamed reply

/// Tracks how much of the in-flight reply has been printed.
///
/// After the event channel lags, fragments are no longer printed one by one;
/// the unprinted tail is taken from the finalized message instead.
#[derive(Debug, Default)]
pub struct ReplyEcho {
    shown: String,
    lagged: bool,
}

impl ReplyEcho {
    /// Text to print for a newly received fragment
    pub fn fragment<'a>(&mut self, fragment: &'a str) -> Option<&'a str> {
        if self.lagged {
            return None;
        }
        self.shown.push_str(fragment);
        Some(fragment)
    }

    /// Record that some events were skipped
    pub fn lagged(&mut self) {
        self.lagged = true;
    }

    /// What is left to print once the reply is final
    pub fn finish<'a>(&self, text: &'a str) -> &'a str {
        if !self.lagged {
            return "";
        }
        text.strip_prefix(self.shown.as_str()).unwrap_or(text)
    }
}

use alerta_client::{percent, BulkAction, BulkProgress};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// `NNN% (index/total)` as shown while a bulk action runs.
pub fn progress_line(index: u64, total: u64) -> String {
    format!("{:>3}% ({index}/{total})", percent(index, total))
}

pub fn summary_line(total: u64) -> String {
    format!("100% ({total}/{total}), done.")
}

/// Draws bulk progress on stdout, redrawing a single line in place.
pub struct TerminalProgress {
    verb: &'static str,
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    pub fn new(action: &BulkAction) -> Self {
        Self { verb: action.verb(), bar: None }
    }
}

impl BulkProgress for TerminalProgress {
    fn counted(&mut self, total: u64) {
        println!("Counting alerts: {total}, done.");
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stdout());
        if let Ok(style) = ProgressStyle::with_template("{prefix}{msg}") {
            bar.set_style(style);
        }
        bar.set_prefix(format!("{} alerts: ", self.verb));
        self.bar = Some(bar);
    }

    fn advanced(&mut self, index: u64, total: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(index);
            bar.set_message(progress_line(index, total));
        }
    }

    fn finished(&mut self, total: u64) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        println!("{} alerts: {}", self.verb, summary_line(total));
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        // Leave the last drawn state visible when a bulk action aborts.
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line() {
        assert_eq!(progress_line(0, 5), "  0% (0/5)");
        assert_eq!(progress_line(2, 5), " 40% (2/5)");
        assert_eq!(progress_line(1, 3), " 33% (1/3)");
        assert_eq!(progress_line(7, 5), "100% (7/5)");
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(summary_line(0), "100% (0/0), done.");
        assert_eq!(summary_line(12), "100% (12/12), done.");
    }
}

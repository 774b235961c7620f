//! Display helpers for episode metadata.

/// Layout for [`format_duration`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DurationFormat {
    #[default]
    HhMmSs,
    MmSs,
    Ss,
}

/// Render a duration in seconds, zero padded.
pub fn format_duration(seconds: f64, format: DurationFormat) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    match format {
        DurationFormat::HhMmSs => format!("{:02}:{:02}:{:02}", hours, minutes, secs),
        DurationFormat::MmSs => format!("{:02}:{:02}", hours * 60 + minutes, secs),
        DurationFormat::Ss => total.to_string(),
    }
}

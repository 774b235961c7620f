//! Plain-text rendering of tracker state.

use actors::TrackerView;
use podcast_core::{
    DurationFormat, Episode, Job, JobStatus, PodcastSummary, Prompts, ResultSnapshot, Stage,
    StageProgress, format_duration,
};

pub fn podcasts(results: &[PodcastSummary]) {
    if results.is_empty() {
        println!("No podcasts found");
        return;
    }
    for podcast in results {
        println!("{}", podcast.name);
        println!("    {}", podcast.feed_url);
        if !podcast.description.is_empty() {
            println!("    {}", podcast.description);
        }
    }
}

pub fn episodes(feed_url: &str, episodes: &[Episode]) {
    println!("{} ({} episodes)", feed_url, episodes.len());
    for (index, episode) in episodes.iter().enumerate() {
        println!(
            "{:>4}  #{:<4} {}  [{}, {}]",
            index,
            episode.number,
            episode.title,
            episode.published,
            format_duration(episode.duration, DurationFormat::HhMmSs)
        );
    }
}

/// One line per pipeline stage: `[x]` done, `[>]` running, `[ ]` pending.
fn pipeline(current: Stage) -> String {
    Stage::PIPELINE
        .iter()
        .map(|stage| {
            let mark = match Stage::progress_of(current, *stage) {
                StageProgress::Completed => "x",
                StageProgress::InProgress => ">",
                StageProgress::Pending => " ",
            };
            format!("[{}] {}", mark, stage)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn job(job: &Job, status: Option<&JobStatus>) {
    println!("{}  {} - {}", job.job_id, job.podcast_name, job.episode_title);
    match status {
        Some(status) => {
            println!(
                "    {} at {} ({}%){}",
                status.status,
                status.current_stage,
                status.progress,
                if status.message.is_empty() {
                    String::new()
                } else {
                    format!(": {}", status.message)
                }
            );
            println!("    {}", pipeline(status.current_stage));
        }
        None => println!("    no status yet"),
    }
}

pub fn jobs(view: &TrackerView) {
    if view.is_idle() {
        println!("No jobs in flight");
        return;
    }
    for (info, status) in view.jobs() {
        job(info, status);
    }
}

pub fn processed(snapshot: &ResultSnapshot) {
    let grouped = snapshot.episodes_by_podcast();
    if grouped.is_empty() {
        println!("No processed episodes");
    }
    for (podcast, records) in grouped {
        println!("{}", podcast);
        for record in records {
            println!("    {}", record.episode_title);
            println!("        audio:      {}", record.edited_audio_locator);
            println!("        transcript: {}", record.transcript_locator);
            println!("        detected:   {}", record.unwanted_content_locator);
        }
    }

    if !snapshot.auto_processed_podcasts.is_empty() {
        println!();
        println!("Auto-processed feeds:");
        for auto in &snapshot.auto_processed_podcasts {
            let name = snapshot
                .podcast_info_by_feed
                .get(&auto.feed_url)
                .map(|info| info.name.as_str())
                .unwrap_or(auto.feed_url.as_str());
            let since = auto
                .enabled_at_utc()
                .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("    {} (since {})", name, since);
        }
    }
}

pub fn prompts(prompts: &Prompts) {
    println!("OpenAI:");
    println!("{}", prompts.openai);
    println!();
    println!("Gemini:");
    println!("{}", prompts.gemini);
}

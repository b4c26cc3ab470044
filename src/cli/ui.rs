use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Prints a stage banner ahead of a pipeline phase.
pub fn stage_banner(text: &str) {
    println!("\n{}\n", style(text).cyan().bold());
}

/// Prints the terminal success line.
pub fn success_banner(text: &str) {
    println!("\n{}\n", style(text).green().bold());
}

/// Creates a new `indicatif::ProgressBar` with standard styling.
pub fn new_progress_bar(len: u64, with_message: bool) -> ProgressBar {
    let template = if with_message {
        "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    } else {
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    };

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

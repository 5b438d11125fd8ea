use indicatif::ProgressStyle;

/// Style for loops over a collection of known size.
pub fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {human_pos:>7}/{human_len:7} {msg}",
    )
    .expect("progress template is valid")
}

/// Style for streaming reads where the total is unknown.
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("[{elapsed_precise}] {spinner:.cyan} {human_pos:>7} {msg}")
        .expect("progress template is valid")
}

use unicode_width::UnicodeWidthChar;

/// Soft-wraps `text` at `width` display columns. Hard newlines always break;
/// carriage returns are dropped.
pub fn wrap_text_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = vec![String::new()];
    let mut line_widths = vec![0usize];
    for ch in text.chars() {
        if ch == '\r' {
            continue;
        }
        if ch == '\n' {
            lines.push(String::new());
            line_widths.push(0);
            continue;
        }
        let ch_width = char_display_width(ch);
        let current_width = *line_widths.last().unwrap_or(&0);
        if current_width + ch_width > width && current_width > 0 {
            lines.push(String::new());
            line_widths.push(0);
        }
        if let Some(line) = lines.last_mut() {
            line.push(ch);
        }
        if let Some(line_width) = line_widths.last_mut() {
            *line_width += ch_width;
        }
    }
    lines
}

/// Soft-wraps `text` at word boundaries the way a wrapping, non-trimming
/// paragraph lays it out. Whitespace at a break point is dropped; a word
/// wider than `width` is split across rows.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for logical in text.split('\n') {
        wrap_logical_line(&logical.replace('\r', ""), width, &mut rows);
    }
    rows
}

fn wrap_logical_line(line: &str, width: usize, rows: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_width = 0usize;
    let mut pending = String::new();
    let mut pending_width = 0usize;

    for (is_space, run) in whitespace_runs(line) {
        let run_width = display_width(run);
        if is_space {
            pending.push_str(run);
            pending_width += run_width;
            continue;
        }

        if current_width + pending_width + run_width <= width {
            current.push_str(&pending);
            current.push_str(run);
            current_width += pending_width + run_width;
        } else if run_width <= width && current_width > 0 {
            rows.push(std::mem::take(&mut current));
            current.push_str(run);
            current_width = run_width;
        } else {
            for ch in pending.chars().chain(run.chars()) {
                let ch_width = char_display_width(ch);
                if current_width + ch_width > width && current_width > 0 {
                    rows.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                current.push(ch);
                current_width += ch_width;
            }
        }
        pending.clear();
        pending_width = 0;
    }

    if current_width + pending_width <= width {
        current.push_str(&pending);
    }
    rows.push(current);
}

fn whitespace_runs(line: &str) -> Vec<(bool, &str)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (index, ch) in line.char_indices() {
        let space = ch.is_whitespace();
        match in_space {
            Some(previous) if previous != space => {
                runs.push((previous, &line[start..index]));
                start = index;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if let Some(space) = in_space {
        runs.push((space, &line[start..]));
    }
    runs
}

/// Rows a list of logical lines occupies once word-wrapped at `width`.
pub fn visual_line_count<'a>(lines: impl IntoIterator<Item = &'a str>, width: usize) -> usize {
    lines
        .into_iter()
        .map(|line| wrap_words(line, width).len())
        .sum()
}

pub fn truncate_to_display_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > max_width && used > 0 {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

/// Fits one line into `width` columns, ending in `...` when cut.
pub fn truncate_line(input: &str, width: usize) -> String {
    let width = width.max(1);
    if display_width(input) <= width {
        return input.to_string();
    }
    if width < 4 {
        return truncate_to_display_width(input, width);
    }
    let mut out = truncate_to_display_width(input, width - 3);
    out.push_str("...");
    out
}

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}

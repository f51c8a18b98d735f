//! Parsers for the `/proc` files read by [`ProcfsSource`](super::ProcfsSource).
//!
//! Pure functions over file contents so they can be tested with plain strings.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Fields of `/proc/<pid>/stat` or `/proc/<pid>/task/<tid>/stat` used here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStat {
    pub id: u64,
    pub comm: String,
    pub state: char,
    /// User-mode time in clock ticks.
    pub utime: u64,
    /// Kernel-mode time in clock ticks.
    pub stime: u64,
    pub num_threads: u32,
    /// Start time after boot in clock ticks.
    pub starttime: u64,
}

/// Parses a `stat` line.
///
/// The comm field is wrapped in parentheses and may itself contain spaces or
/// parentheses, so fields are counted from the last `)`.
pub fn parse_task_stat(content: &str) -> Result<TaskStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;
    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let id: u64 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid id"))?;
    let comm = content[open_paren + 1..close_paren].to_string();

    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
    if fields.len() < 20 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 20+, got {}",
            fields.len()
        )));
    }

    let parse_u64 = |idx: usize, name: &str| -> Result<u64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(TaskStat {
        id,
        comm,
        state: fields[0].chars().next().unwrap_or('?'),
        utime: parse_u64(11, "utime")?,
        stime: parse_u64(12, "stime")?,
        num_threads: u32::try_from(parse_u64(17, "num_threads")?)
            .map_err(|_| ParseError::new("num_threads out of range"))?,
        starttime: parse_u64(19, "starttime")?,
    })
}

/// Parses `/proc/uptime` into seconds since boot.
pub fn parse_uptime(content: &str) -> Result<f64, ParseError> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::new("empty uptime"))?
        .parse()
        .map_err(|_| ParseError::new("invalid uptime"))
}

/// Counts per-CPU lines (`cpu0`, `cpu1`, ...) in `/proc/stat`.
pub fn count_processors(content: &str) -> u32 {
    content
        .lines()
        .filter(|line| {
            line.strip_prefix("cpu")
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_digit())
        })
        .count() as u32
}

/// Joins the NUL-separated `/proc/<pid>/cmdline` into one line.
pub fn parse_cmdline(content: &str) -> String {
    content
        .split('\0')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts frames from `/proc/<pid>/task/<tid>/stack`.
///
/// Lines look like `[<0>] do_epoll_wait+0x4a8/0x640`; the address prefix is
/// dropped and at most `max_depth` frames are kept.
pub fn parse_kernel_stack(content: &str, max_depth: usize) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let frame = match line.find("] ") {
                Some(pos) => &line[pos + 2..],
                None => line,
            };
            let frame = frame.trim();
            (!frame.is_empty()).then(|| frame.to_string())
        })
        .take(max_depth)
        .collect()
}

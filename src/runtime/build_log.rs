use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

pub(crate) const TAIL_LINES: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BuildLine {
    /// A new build step starts, e.g. `#5 [2/6] RUN npm ci` or `Step 2/6 : RUN npm ci`.
    Step(String),
    /// Completion or cache markers: `#5 DONE 3.1s`, `#5 CACHED`, `Successfully tagged ...`.
    Done(String),
    Failure,
    /// Output produced inside a step.
    Noise(Option<String>),
}

struct Patterns {
    buildkit_step: Regex,
    buildkit_done: Regex,
    buildkit_error: Regex,
    buildkit_output: Regex,
    legacy_step: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        buildkit_step: Regex::new(r"^#(\d+) \[[^\]]+\]").expect("valid regex"),
        buildkit_done: Regex::new(r"^#(\d+) (DONE [\d.]+s|CACHED)$").expect("valid regex"),
        buildkit_error: Regex::new(r"^(#\d+ ERROR|ERROR[: ])").expect("valid regex"),
        buildkit_output: Regex::new(r"^#(\d+) ").expect("valid regex"),
        legacy_step: Regex::new(r"^Step (\d+)/\d+ : ").expect("valid regex"),
    })
}

pub(crate) fn classify(line: &str) -> BuildLine {
    let patterns = patterns();

    if patterns.buildkit_error.is_match(line) {
        return BuildLine::Failure;
    }

    if let Some(captures) = patterns.buildkit_done.captures(line) {
        return BuildLine::Done(captures[1].to_string());
    }

    if let Some(captures) = patterns.buildkit_step.captures(line) {
        return BuildLine::Step(captures[1].to_string());
    }

    if let Some(captures) = patterns.legacy_step.captures(line) {
        return BuildLine::Step(captures[1].to_string());
    }

    if line.contains("---> Using cache")
        || line.starts_with("Successfully built")
        || line.starts_with("Successfully tagged")
    {
        return BuildLine::Done(String::new());
    }

    if let Some(captures) = patterns.buildkit_output.captures(line) {
        return BuildLine::Noise(Some(captures[1].to_string()));
    }

    BuildLine::Noise(None)
}

/// Decides which build output lines reach the log, keeping a tail for diagnostics.
pub(crate) struct BuildLogFilter {
    throttle: Duration,
    current_step: Option<String>,
    last_emitted: HashMap<String, Instant>,
    tail: VecDeque<String>,
}

impl BuildLogFilter {
    pub(crate) fn new(throttle: Duration) -> BuildLogFilter {
        BuildLogFilter {
            throttle,
            current_step: None,
            last_emitted: HashMap::new(),
            tail: VecDeque::with_capacity(TAIL_LINES),
        }
    }

    pub(crate) fn accept(&mut self, line: &str, now: Instant) -> Option<String> {
        let line = line.trim_end();
        if line.is_empty() {
            return None;
        }

        if self.tail.len() == TAIL_LINES {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());

        match classify(line) {
            BuildLine::Step(step) => {
                self.current_step = Some(step);
                Some(line.to_string())
            }
            BuildLine::Done(_) | BuildLine::Failure => Some(line.to_string()),
            BuildLine::Noise(step) => {
                let key = step
                    .or_else(|| self.current_step.clone())
                    .unwrap_or_default();

                match self.last_emitted.get(&key) {
                    Some(last) if now.duration_since(*last) < self.throttle => None,
                    _ => {
                        self.last_emitted.insert(key, now);
                        Some(line.to_string())
                    }
                }
            }
        }
    }

    pub(crate) fn tail(&self) -> Vec<String> {
        self.tail.iter().cloned().collect()
    }
}

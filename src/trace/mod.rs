//! Textual event traces
//!
//! A trace scripts a [`ScriptedHost`](crate::host::ScriptedHost) run, one
//! directive per line. Blank lines and `#` comments are ignored.
//!
//! ```text
//! arm   Cache.fill()          # pre-check
//! exec  Cache.fill()          # non-return instruction
//! new   buf 128               # create object `buf` of 128 bytes
//! free  buf                   # release it
//! ret   Cache.fill()          # return instruction
//! raise Cache.fill() IOError  # record an exceptional outcome
//! check Cache.fill() 0        # post-check, optional byte limit
//! ```

mod replay;

pub use replay::{render_report, write_report, CheckReport, ReplayReport, TraceReplay};

use anyhow::{anyhow, bail, Context, Result};

/// One parsed trace directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Run the memory goal's pre-check for a method
    Arm(String),
    /// Execute a non-return instruction owned by a method
    Exec(String),
    /// Execute a return instruction owned by a method
    Ret(String),
    /// Create a labelled object of the given size
    New {
        /// Label used by later `free` lines
        label: String,
        /// Size in bytes
        size_bytes: u64,
    },
    /// Release a labelled object
    Free(String),
    /// Mark the next check of a method as having raised
    Raise {
        /// Method that raised
        method: String,
        /// Exception description
        exception: String,
    },
    /// Run the post-check for a method
    Check {
        /// Method to check
        method: String,
        /// Limit overriding the configured default
        max_growth_bytes: Option<i64>,
    },
}

/// A directive with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    /// Line number in the trace text
    pub number: usize,
    /// Parsed directive
    pub directive: Directive,
}

/// Parse a whole trace.
pub fn parse_trace(text: &str) -> Result<Vec<TraceLine>> {
    let mut lines = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let number = idx + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let directive =
            parse_directive(content).with_context(|| format!("trace line {}", number))?;
        lines.push(TraceLine { number, directive });
    }
    Ok(lines)
}

fn parse_directive(content: &str) -> Result<Directive> {
    let mut fields = content.split_whitespace();
    let keyword = fields.next().ok_or_else(|| anyhow!("empty directive"))?;
    let mut operand = |what: &str| {
        fields
            .next()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("`{}` is missing its {}", keyword, what))
    };

    let directive = match keyword {
        "arm" => Directive::Arm(operand("method")?),
        "exec" => Directive::Exec(operand("method")?),
        "ret" => Directive::Ret(operand("method")?),
        "new" => {
            let label = operand("label")?;
            let size = operand("size")?;
            let size_bytes = size
                .parse::<u64>()
                .with_context(|| format!("invalid object size '{}'", size))?;
            Directive::New { label, size_bytes }
        }
        "free" => Directive::Free(operand("label")?),
        "raise" => {
            let method = operand("method")?;
            let exception = fields.by_ref().collect::<Vec<_>>().join(" ");
            Directive::Raise {
                method,
                exception: if exception.is_empty() {
                    "exception".to_string()
                } else {
                    exception
                },
            }
        }
        "check" => {
            let method = operand("method")?;
            let max_growth_bytes = match fields.next() {
                Some(limit) => Some(
                    limit
                        .parse::<i64>()
                        .with_context(|| format!("invalid byte limit '{}'", limit))?,
                ),
                None => None,
            };
            Directive::Check {
                method,
                max_growth_bytes,
            }
        }
        other => bail!("unknown directive '{}'", other),
    };

    if let Some(extra) = fields.next() {
        bail!("unexpected trailing field '{}'", extra);
    }
    Ok(directive)
}

//! Request metrics
//!
//! A small registry owned by the process supervisor and handed to the tool
//! handlers and the HTTP layer. Rendered in the Prometheus text exposition
//! format by the metrics endpoint.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Content type of the rendered exposition text
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Histogram upper bounds in seconds
const DURATION_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Outcome label shared by every metric family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }

    pub fn from_result<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::Error
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Histogram {
    /// Non-cumulative counts per bucket; the last slot is `+Inf`
    buckets: [u64; DURATION_BUCKETS.len() + 1],
    sum: f64,
    count: u64,
}

impl Histogram {
    fn observe(&mut self, seconds: f64) {
        let slot = DURATION_BUCKETS
            .iter()
            .position(|bound| seconds <= *bound)
            .unwrap_or(DURATION_BUCKETS.len());
        self.buckets[slot] += 1;
        self.sum += seconds;
        self.count += 1;
    }
}

type DurationFamily = BTreeMap<(&'static str, Outcome), Histogram>;
type TransportFamily = BTreeMap<(&'static str, String, Outcome), u64>;

/// Metrics registry
#[derive(Debug)]
pub struct Metrics {
    version: String,
    started: Instant,
    tool_durations: Mutex<DurationFamily>,
    operation_durations: Mutex<DurationFamily>,
    transport_requests: Mutex<TransportFamily>,
}

impl Metrics {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            started: Instant::now(),
            tool_durations: Mutex::new(BTreeMap::new()),
            operation_durations: Mutex::new(BTreeMap::new()),
            transport_requests: Mutex::new(BTreeMap::new()),
        }
    }

    /// Record one tool call and the time operation behind it
    pub fn observe_tool(
        &self,
        tool: &'static str,
        operation: &'static str,
        outcome: Outcome,
        elapsed: Duration,
    ) {
        let seconds = elapsed.as_secs_f64();
        lock(&self.tool_durations)
            .entry((tool, outcome))
            .or_default()
            .observe(seconds);
        lock(&self.operation_durations)
            .entry((operation, outcome))
            .or_default()
            .observe(seconds);
    }

    pub fn record_transport_request(&self, transport: &'static str, method: &str, outcome: Outcome) {
        *lock(&self.transport_requests)
            .entry((transport, method.to_string(), outcome))
            .or_insert(0) += 1;
    }

    /// Number of recorded calls for `tool` with `outcome`
    #[cfg(test)]
    pub fn tool_request_count(&self, tool: &str, outcome: Outcome) -> u64 {
        lock(&self.tool_durations)
            .iter()
            .filter(|((name, o), _)| *name == tool && *o == outcome)
            .map(|(_, h)| h.count)
            .sum()
    }

    #[cfg(test)]
    pub fn transport_request_count(&self, transport: &str, method: &str, outcome: Outcome) -> u64 {
        lock(&self.transport_requests)
            .iter()
            .filter(|((t, m, o), _)| *t == transport && m == method && *o == outcome)
            .map(|(_, count)| *count)
            .sum()
    }

    /// Render every family in Prometheus exposition format
    pub fn render(&self) -> String {
        let mut output = String::with_capacity(4096);

        let _ = writeln!(output, "# HELP mcp_time_info Time MCP server information");
        let _ = writeln!(output, "# TYPE mcp_time_info gauge");
        let _ = writeln!(output, "mcp_time_info{{version=\"{}\"}} 1", escape(&self.version));

        let _ = writeln!(output, "# HELP mcp_time_uptime_seconds Time since server start");
        let _ = writeln!(output, "# TYPE mcp_time_uptime_seconds counter");
        let _ = writeln!(
            output,
            "mcp_time_uptime_seconds {}",
            self.started.elapsed().as_secs()
        );

        {
            let tools = lock(&self.tool_durations);
            let _ = writeln!(
                output,
                "# HELP mcp_time_tool_requests_total Total tool calls by tool and status"
            );
            let _ = writeln!(output, "# TYPE mcp_time_tool_requests_total counter");
            for ((tool, outcome), histogram) in tools.iter() {
                let _ = writeln!(
                    output,
                    "mcp_time_tool_requests_total{{tool=\"{}\",status=\"{}\"}} {}",
                    tool,
                    outcome.as_str(),
                    histogram.count
                );
            }
            write_histograms(
                &mut output,
                "mcp_time_tool_request_duration_seconds",
                "Tool call duration in seconds",
                "tool",
                &tools,
            );
        }

        write_histograms(
            &mut output,
            "mcp_time_operation_duration_seconds",
            "Time operation duration in seconds",
            "operation",
            &lock(&self.operation_durations),
        );

        let _ = writeln!(
            output,
            "# HELP mcp_time_transport_requests_total Total MCP transport requests"
        );
        let _ = writeln!(output, "# TYPE mcp_time_transport_requests_total counter");
        for ((transport, method, outcome), count) in lock(&self.transport_requests).iter() {
            let _ = writeln!(
                output,
                "mcp_time_transport_requests_total{{transport=\"{}\",method=\"{}\",status=\"{}\"}} {}",
                transport,
                escape(method),
                outcome.as_str(),
                count
            );
        }

        output
    }
}

fn write_histograms(
    output: &mut String,
    name: &str,
    help: &str,
    label: &str,
    family: &DurationFamily,
) {
    let _ = writeln!(output, "# HELP {} {}", name, help);
    let _ = writeln!(output, "# TYPE {} histogram", name);
    for ((key, outcome), histogram) in family {
        let labels = format!("{}=\"{}\",status=\"{}\"", label, key, outcome.as_str());
        let mut cumulative = 0;
        for (bound, count) in DURATION_BUCKETS.iter().zip(histogram.buckets.iter()) {
            cumulative += count;
            let _ = writeln!(output, "{}_bucket{{{},le=\"{}\"}} {}", name, labels, bound, cumulative);
        }
        let _ = writeln!(
            output,
            "{}_bucket{{{},le=\"+Inf\"}} {}",
            name, labels, histogram.count
        );
        let _ = writeln!(output, "{}_sum{{{}}} {}", name, labels, histogram.sum);
        let _ = writeln!(output, "{}_count{{{}}} {}", name, labels, histogram.count);
    }
}

/// Label values may not contain raw quotes, backslashes or newlines
fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// A panicked recorder leaves counters usable
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

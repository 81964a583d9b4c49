//! Markdown and HTML rendering of reports

use crate::error::Result;
use minijinja::{context, Environment};
use regex::Regex;
use serde::Serialize;
use site_pulse_core::{ComparisonResult, ComparisonStatus, Metric, MetricSnapshot, Report, Site};

const MARKDOWN_TEMPLATE: &str = r#"# {{ title }}

Generated {{ generated_at }} for **{{ target.label }}** ({{ target.url }})

| Metric | Value |
|---|---|
| Performance | {{ target.performance }} |
| LCP | {{ target.lcp }} |
| CLS | {{ target.cls }} |

Leading in {{ leading }} comparison(s), trailing in {{ trailing }}.
{% for competitor in competitors %}
## vs {{ competitor.label }}

| Metric | {{ target.label }} | {{ competitor.label }} | Delta | Status |
|---|---|---|---|---|
{% for row in competitor.rows %}| {{ row.metric }} | {{ row.target }} | {{ row.competitor }} | {{ row.delta }} | {{ row.status }} |
{% endfor %}{% endfor %}{% if missing %}
## Missing competitors

These competitors could not be measured in this run:
{% for site in missing %}- {{ site }}
{% endfor %}{% endif %}
## Recommendations
{% for rec in recommendations %}
### [{{ rec.priority }}] {{ rec.title }}

{{ rec.detail }}{% if rec.savings %} ({{ rec.savings }}){% endif %}
{% else %}
No improvement opportunities found.
{% endfor %}"#;

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{{ title }}</title>
    <style>
        body { font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif; color: #24292f; max-width: 860px; margin: 0 auto; padding: 1.5rem; }
        table { border-collapse: collapse; margin: 1rem 0; width: 100%; }
        th, td { border: 1px solid #d0d7de; padding: 0.4rem 0.6rem; text-align: left; }
        th { background: #f6f8fa; }
        .leading { color: #1a7f37; }
        .trailing { color: #cf222e; }
        .tied { color: #6e7781; }
        .missing { background: #fff8c5; border: 1px solid #d4a72c; padding: 0.75rem; border-radius: 6px; }
        .priority { font-size: 0.8rem; text-transform: uppercase; padding: 0.1rem 0.4rem; border-radius: 4px; background: #eaeef2; }
        .priority-urgent { background: #ffebe9; color: #cf222e; }
        .priority-medium { background: #fff8c5; color: #9a6700; }
    </style>
</head>
<body>
    <h1>{{ title }}</h1>
    <p>Generated {{ generated_at }} for <strong>{{ target.label }}</strong> (<a href="{{ target.url }}">{{ target.url }}</a>)</p>

    <table>
        <tr><th>Performance</th><th>LCP</th><th>CLS</th></tr>
        <tr><td>{{ target.performance }}</td><td>{{ target.lcp }}</td><td>{{ target.cls }}</td></tr>
    </table>
    <p>Leading in {{ leading }} comparison(s), trailing in {{ trailing }}.</p>
{% for competitor in competitors %}
    <h2>vs {{ competitor.label }}</h2>
    <table>
        <tr><th>Metric</th><th>{{ target.label }}</th><th>{{ competitor.label }}</th><th>Delta</th><th>Status</th></tr>
{% for row in competitor.rows %}
        <tr><td>{{ row.metric }}</td><td>{{ row.target }}</td><td>{{ row.competitor }}</td><td>{{ row.delta }}</td><td class="{{ row.status }}">{{ row.status }}</td></tr>
{% endfor %}
    </table>
{% endfor %}
{% if missing %}
    <div class="missing">
        <h2>Missing competitors</h2>
        <p>These competitors could not be measured in this run:</p>
        <ul>
{% for site in missing %}
            <li>{{ site }}</li>
{% endfor %}
        </ul>
    </div>
{% endif %}
    <h2>Recommendations</h2>
{% for rec in recommendations %}
    <h3><span class="priority priority-{{ rec.priority }}">{{ rec.priority }}</span> {{ rec.title }}</h3>
    <p>{{ rec.detail }}{% if rec.savings %} <em>({{ rec.savings }})</em>{% endif %}</p>
{% else %}
    <p>No improvement opportunities found.</p>
{% endfor %}
</body>
</html>
"#;

/// A report rendered for delivery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedReport {
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
struct SiteView {
    label: String,
    url: String,
    performance: String,
    lcp: String,
    cls: String,
}

#[derive(Debug, Serialize)]
struct RowView {
    metric: &'static str,
    target: String,
    competitor: String,
    delta: String,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct CompetitorView {
    label: String,
    rows: Vec<RowView>,
}

#[derive(Debug, Serialize)]
struct RecommendationView {
    priority: &'static str,
    title: String,
    detail: String,
    savings: Option<String>,
}

/// Renders reports through minijinja templates
pub struct Renderer {
    env: Environment<'static>,
    invisible: Regex,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        Self::with_templates(MARKDOWN_TEMPLATE, HTML_TEMPLATE)
    }

    /// Use custom Markdown and HTML templates; both see the same context
    pub fn with_templates(markdown: &'static str, html: &'static str) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("report.md", markdown)?;
        env.add_template("report.html", html)?;

        Ok(Self {
            env,
            invisible: Regex::new("[\u{200B}-\u{200D}\u{FEFF}]")?,
        })
    }

    /// Render `report`, looking up labels and URLs in `sites`
    pub fn render(&self, report: &Report, sites: &[Site]) -> Result<RenderedReport> {
        let target = site_view(&report.target_snapshot, sites);

        let competitors: Vec<CompetitorView> = report
            .competitor_snapshots
            .iter()
            .map(|snapshot| CompetitorView {
                label: label_for(&snapshot.site_id, sites),
                rows: report
                    .comparisons_for(&snapshot.site_id)
                    .map(row_view)
                    .collect(),
            })
            .collect();

        let missing: Vec<String> = report
            .missing_competitors
            .iter()
            .map(|id| label_for(id, sites))
            .collect();

        let recommendations: Vec<RecommendationView> = report
            .recommendations
            .iter()
            .map(|rec| RecommendationView {
                priority: rec.priority.as_str(),
                title: rec.localized_title.clone(),
                detail: rec.localized_detail.clone(),
                savings: savings_text(rec.estimated_savings_ms, rec.estimated_savings_bytes)
                    .or_else(|| rec.display_value.clone()),
            })
            .collect();

        let title = format!("Performance report: {}", target.label);
        let subject = format!(
            "{} - {}",
            title,
            report.generated_at.format("%Y-%m-%d")
        );
        let ctx = context! {
            title => title,
            generated_at => report.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            target => target,
            leading => report.leading_count(),
            trailing => report.trailing_count(),
            competitors => competitors,
            missing => missing,
            recommendations => recommendations,
        };

        let text = self.env.get_template("report.md")?.render(&ctx)?;
        let html = self.env.get_template("report.html")?.render(&ctx)?;

        Ok(RenderedReport {
            subject: self.sanitize(&subject),
            text: self.sanitize(&text),
            html: self.sanitize(&html),
        })
    }

    /// Strip zero-width characters and turn non-breaking spaces into spaces
    pub fn sanitize(&self, text: &str) -> String {
        self.invisible.replace_all(text, "").replace('\u{00A0}', " ")
    }
}

fn label_for(site_id: &str, sites: &[Site]) -> String {
    sites
        .iter()
        .find(|s| s.id == site_id)
        .map(|s| s.label.clone())
        .unwrap_or_else(|| site_id.to_string())
}

fn site_view(snapshot: &MetricSnapshot, sites: &[Site]) -> SiteView {
    let site = sites.iter().find(|s| s.id == snapshot.site_id);
    SiteView {
        label: label_for(&snapshot.site_id, sites),
        url: site.map(|s| s.url.clone()).unwrap_or_default(),
        performance: format_value(Metric::Performance, f64::from(snapshot.performance_score)),
        lcp: format_value(Metric::Lcp, snapshot.lcp_seconds),
        cls: format_value(Metric::Cls, snapshot.cls_score),
    }
}

fn row_view(result: &ComparisonResult) -> RowView {
    RowView {
        metric: result.metric.label(),
        target: format_value(result.metric, result.target_value),
        competitor: format_value(result.metric, result.competitor_value),
        delta: format_delta(result.metric, result.delta),
        status: match result.status {
            ComparisonStatus::Leading => "leading",
            ComparisonStatus::Trailing => "trailing",
            ComparisonStatus::Tied => "tied",
        },
    }
}

fn format_value(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Performance => format!("{:.0}", value),
        Metric::Lcp => format!("{:.2} s", value),
        Metric::Cls => format!("{:.4}", value),
    }
}

fn format_delta(metric: Metric, delta: f64) -> String {
    match metric {
        Metric::Performance => format!("{:+.0}", delta),
        Metric::Lcp => format!("{:+.2} s", delta),
        Metric::Cls => format!("{:+.4}", delta),
    }
}

fn savings_text(ms: Option<u64>, bytes: Option<u64>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(ms) = ms.filter(|ms| *ms > 0) {
        parts.push(format!("~{} ms", ms));
    }
    if let Some(bytes) = bytes.filter(|b| *b > 0) {
        parts.push(format!("~{} KiB", (bytes + 1023) / 1024));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

//! Draft ticket rendering. Markdown sections appear only when their source
//! list is non-empty; a header never sits over nothing.

use chrono::{DateTime, Utc};

use triage_domain::{AlertStatus, EvidenceBundle, JiraDraftTicket};

const MAX_ALERTS: usize = 5;
const MAX_SIGNALS: usize = 6;
const MAX_RUNBOOKS: usize = 5;
const MAX_STEPS: usize = 8;

pub fn draft(bundle: &EvidenceBundle, evidence_uri: Option<&str>) -> JiraDraftTicket {
    draft_at(bundle, evidence_uri, Utc::now())
}

pub fn draft_at(
    bundle: &EvidenceBundle,
    evidence_uri: Option<&str>,
    now: DateTime<Utc>,
) -> JiraDraftTicket {
    let priority = bundle.most_severe_priority();

    let mut labels = vec!["incident".to_string(), slugify(&bundle.service)];
    if bundle.alerts.iter().any(|a| a.status == AlertStatus::Triggered) {
        labels.push("triggered".to_string());
    }

    JiraDraftTicket {
        incident_id: bundle.incident_id.clone(),
        title: format!(
            "[{priority}] {} incident – {}",
            bundle.service, bundle.incident_id
        ),
        priority,
        labels,
        description_md: render_body(bundle, evidence_uri),
        evidence_uri: evidence_uri.map(str::to_string),
        generated_at: now,
    }
}

/// Lower-case, with runs of spaces, underscores and hyphens collapsed to a
/// single hyphen.
pub fn slugify(service: &str) -> String {
    let mut slug = String::with_capacity(service.len());
    let mut pending_sep = false;
    for c in service.to_lowercase().chars() {
        if c == ' ' || c == '_' || c == '-' {
            pending_sep = !slug.is_empty();
        } else {
            if pending_sep {
                slug.push('-');
                pending_sep = false;
            }
            slug.push(c);
        }
    }
    slug
}

fn render_body(bundle: &EvidenceBundle, evidence_uri: Option<&str>) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "## Summary\nService: **{}**\nIncident: **{}**\nWindow: **{} → {}**\n",
        bundle.service,
        bundle.incident_id,
        bundle.time_window.start.to_rfc3339(),
        bundle.time_window.end.to_rfc3339(),
    ));
    if let Some(uri) = evidence_uri {
        lines.push(format!("Evidence Bundle: `{uri}`\n"));
    }

    if !bundle.alerts.is_empty() {
        lines.push("## Alerts\n".to_string());
        for alert in bundle.alerts.iter().take(MAX_ALERTS) {
            lines.push(format!(
                "- **{}** ({}) — `{}` / `{}`",
                alert.name, alert.provider, alert.status, alert.priority
            ));
        }
    }

    if !bundle.signals.is_empty() {
        lines.push("\n## Signals\n".to_string());
        for signal in bundle.signals.iter().take(MAX_SIGNALS) {
            match &signal.unit {
                Some(unit) => lines.push(format!("- `{}`: **{}** ({unit})", signal.key, signal.value)),
                None => lines.push(format!("- `{}`: **{}**", signal.key, signal.value)),
            }
        }
    }

    if !bundle.runbook_hits.is_empty() {
        lines.push("\n## Runbook hits\n".to_string());
        let mut hits = bundle.runbook_hits.clone();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        for hit in hits.iter().take(MAX_RUNBOOKS) {
            lines.push(format!(
                "- **{}** (score={}) — {}",
                hit.title, hit.score, hit.doc_id
            ));
        }
    }

    if !bundle.recommended_next_steps.is_empty() {
        lines.push("\n## Recommended next steps\n".to_string());
        for step in bundle.recommended_next_steps.iter().take(MAX_STEPS) {
            lines.push(format!("- {step}"));
        }
    }

    if !bundle.links.is_empty() {
        lines.push("\n## Links\n".to_string());
        for link in &bundle.links {
            lines.push(format!("- **{}**: {}", link.kind, link.url));
        }
    }

    let mut body = lines.join("\n").trim().to_string();
    body.push('\n');
    body
}

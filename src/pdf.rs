use crate::{dates::format_date, models::Trip};
use anyhow::anyhow;
use printpdf::*;
use std::io::BufWriter;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 15.0;
const BODY_SIZE: f32 = 11.0;
const LINE_MM: f32 = 6.0;
const WRAP_CHARS: usize = 90;

/// Text-only itinerary for one trip.
pub fn generate_itinerary_pdf(trip: &Trip) -> anyhow::Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Trip: {}", truncate(&trip.name, 48)),
        Mm(PAGE_W),
        Mm(PAGE_H),
        "Layer 1",
    );
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| anyhow!("font error: {:?}", e))?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|e| anyhow!("font error: {:?}", e))?;

    let mut layer_ref = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_H - 22.0;

    layer_ref.use_text(truncate(&trip.name, 60), 20.0, Mm(MARGIN), Mm(y), &bold);
    y -= 12.0;

    let mut lines: Vec<(String, bool)> = vec![
        (format!("Dates: {} - {}", format_date(trip.start_date.as_deref()), format_date(trip.end_date.as_deref())), false),
        (format!("Destinations: {}", join_or_na(&trip.destinations)), false),
    ];
    for (label, value) in [("Budget", &trip.budget), ("Travel style", &trip.travel_style), ("Interests", &trip.interests)] {
        if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
            lines.push((format!("{label}: {v}"), false));
        }
    }
    lines.push((String::new(), false));
    lines.push(("Activities".to_string(), true));
    if trip.activities.is_empty() {
        lines.push(("No activities planned yet.".to_string(), false));
    }
    lines.extend(trip.activities.iter().map(|a| (format!("- {a}"), false)));
    if let Some(notes) = trip.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push((String::new(), false));
        lines.push(("Notes".to_string(), true));
        lines.extend(notes.lines().map(|l| (l.to_string(), false)));
    }
    if let Some(summary) = trip.ai_summary.as_deref() {
        lines.push((String::new(), false));
        lines.push(("AI summary".to_string(), true));
        lines.extend(summary.lines().map(|l| (l.to_string(), false)));
    }

    for (text, heading) in lines {
        for line in wrap(&text, WRAP_CHARS) {
            if y < MARGIN + LINE_MM {
                let (next_page, next_layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
                layer_ref = doc.get_page(next_page).get_layer(next_layer);
                y = PAGE_H - 22.0;
            }
            let (size, face) = if heading { (13.0, &bold) } else { (BODY_SIZE, &font) };
            layer_ref.use_text(line, size, Mm(MARGIN), Mm(y), face);
            y -= if heading { LINE_MM + 1.5 } else { LINE_MM };
        }
    }

    let mut buf: Vec<u8> = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buf);
        doc.save(&mut writer).map_err(|e| anyhow!("pdf save error: {:?}", e))?;
    }
    Ok(buf)
}

fn join_or_na(items: &[String]) -> String {
    if items.is_empty() { "N/A".to_string() } else { items.join(", ") }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

/// Greedy word wrap; an empty input yields one empty line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }
    out
}

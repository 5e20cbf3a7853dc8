//! Credential layout.
//!
//! Reproduces the fixed A4 credential layout: header, general
//! information grid, per-vehicle bordered blocks with pagination, the
//! message/consent section and the QR code. All coordinates are PDF
//! points with the origin at the bottom-left corner; the cursor `y`
//! walks down the page.

use chrono::{DateTime, Datelike, Utc};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, LineDashPattern, Mm, PdfDocumentReference,
    PdfLayerReference, Point, Pt, Rect, Rgb,
};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use quai_core::{Accreditation, EventKey, NewVehicle, Status, UnloadingProvider};

use crate::wrap::{wrap_chars, wrap_words};

/// A4 portrait, points.
const PAGE_WIDTH: f32 = 595.276;
const PAGE_HEIGHT: f32 = 841.89;
/// Standard page margin.
const MARGIN: f32 = 50.0;
/// Left edge of the label column.
const LABEL_X: f32 = 60.0;
/// Fixed label column width.
const LABEL_WIDTH: f32 = 150.0;
/// Left edge of the value column.
const VALUE_X: f32 = LABEL_X + LABEL_WIDTH + 10.0;
/// The value column stops short of the right margin to leave room for
/// the QR code column.
const VALUE_MAX_WIDTH: f32 = PAGE_WIDTH - VALUE_X - 120.0;
/// Grid row height (12 pt text + 4).
const LINE_HEIGHT: f32 = 16.0;
/// Inner padding of a vehicle block border.
const BLOCK_PADDING: f32 = 12.0;
/// Remaining vertical space below which a vehicle block moves to a
/// fresh page. Keeps blocks from straddling a page boundary.
const PAGE_BREAK_THRESHOLD: f32 = 180.0;
/// Side length of the QR code area.
const QR_SIZE: f32 = 80.0;

/// Rendering failed; the caller gets a generic "PDF generation failed"
/// and the partial document is discarded.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The accreditation id could not be encoded as a QR code.
    #[error("QR code generation failed: {0}")]
    Qr(#[from] qrcode::types::QrError),

    /// The PDF backend rejected the document.
    #[error("PDF layout failed: {0}")]
    Layout(String),
}

/// Rendering-ready payload. Mirrors the stateless `POST
/// /accreditation/pdf` body; [`From<&Accreditation>`] builds it from a
/// stored record for the email path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CredentialPayload {
    /// Accreditation id; drives the QR code. Absent for previews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub company: String,
    pub stand: String,
    pub unloading: UnloadingProvider,
    pub event: EventKey,
    pub vehicles: Vec<NewVehicle>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub consent: bool,
    /// Current status; `ATTENTE` when absent (fresh submissions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_at: Option<DateTime<Utc>>,
}

impl From<&Accreditation> for CredentialPayload {
    fn from(acc: &Accreditation) -> Self {
        CredentialPayload {
            id: Some(acc.id),
            company: acc.company.clone(),
            stand: acc.stand.clone(),
            unloading: acc.unloading,
            event: acc.event,
            vehicles: acc
                .vehicles
                .iter()
                .map(|v| NewVehicle {
                    plate: v.plate.clone(),
                    size: v.size,
                    phone_code: v.phone_code.clone(),
                    phone_number: v.phone_number.clone(),
                    date: v.date.clone(),
                    time: v.time.clone(),
                    city: v.city.clone(),
                    unloading: v.unloading.clone(),
                    kms: v.kms.clone(),
                })
                .collect(),
            message: acc.message.clone(),
            consent: acc.consent,
            status: Some(acc.status),
            entry_at: acc.entry_at,
            exit_at: acc.exit_at,
        }
    }
}

/// Render the credential to PDF bytes. All-or-nothing; nothing is
/// written to disk.
pub fn render_credential(payload: &CredentialPayload) -> Result<Vec<u8>, RenderError> {
    let (doc, stats) = render_internal(payload)?;
    let _ = stats;
    doc.save_to_bytes().map_err(|e| RenderError::Layout(e.to_string()))
}

/// Layout statistics, used by the pagination tests.
#[derive(Debug, Default)]
pub(crate) struct RenderStats {
    /// Number of pages in the document.
    pub pages: usize,
    /// Per vehicle: (page index, border top y, border bottom y).
    pub vehicle_spans: Vec<(usize, f32, f32)>,
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn mm(pt: f32) -> Mm {
    Mm::from(Pt(pt))
}

struct Renderer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    y: f32,
    page: usize,
}

impl Renderer {
    fn new(title: &str) -> Result<Self, RenderError> {
        let (doc, page, layer) =
            printpdf::PdfDocument::new(title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Layout(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Renderer {
            doc,
            layer,
            font,
            y: PAGE_HEIGHT - MARGIN,
            page: 0,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page += 1;
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn text(&self, s: &str, x: f32, y: f32, size: f32, color: Color) {
        self.layer.set_fill_color(color);
        self.layer.use_text(s, size, mm(x), mm(y), &self.font);
    }

    /// Draw wrapped value text starting at `(x, y)`; returns the y of
    /// the line after the last one drawn. Empty values still consume
    /// one row so the following label cannot overprint this one.
    fn text_wrapped(&self, s: &str, x: f32, mut y: f32, max_width: f32, size: f32, color: Color) -> f32 {
        let lines = wrap_words(s, size, max_width);
        let line_height = size + 4.0;
        if lines.is_empty() {
            return y - line_height;
        }
        for line in lines {
            self.text(&line, x, y, size, color.clone());
            y -= line_height;
        }
        y
    }

    fn dashed_separator(&self, y: f32) {
        self.layer.set_outline_color(rgb(0.9, 0.9, 0.9));
        self.layer.set_outline_thickness(1.0);
        self.layer.set_line_dash_pattern(LineDashPattern {
            dash_1: Some(3),
            gap_1: Some(3),
            ..LineDashPattern::default()
        });
        self.layer.add_line(Line {
            points: vec![
                (Point::new(mm(MARGIN), mm(y)), false),
                (Point::new(mm(PAGE_WIDTH - MARGIN), mm(y)), false),
            ],
            is_closed: false,
        });
        self.layer.set_line_dash_pattern(LineDashPattern::default());
    }

    /// One row of the general-information grid.
    fn label_value(&mut self, label: &str, value: &str, value_color: Color) {
        self.text(&format!("{label} :"), LABEL_X, self.y, 12.0, rgb(0.15, 0.15, 0.15));
        self.y = self.text_wrapped(value, VALUE_X, self.y, VALUE_MAX_WIDTH, 12.0, value_color);
    }
}

/// Months in French, for the localized issue date.
const FRENCH_MONTHS: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
    "octobre", "novembre", "décembre",
];

fn format_issue_date(date: DateTime<Utc>) -> String {
    format!(
        "{:02} {} {}",
        date.day(),
        FRENCH_MONTHS[date.month0() as usize],
        date.year()
    )
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%d/%m/%Y %H:%M:%S").to_string()
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Entree => rgb(0.0, 0.55, 0.2),
        Status::Sortie => rgb(0.7, 0.0, 0.0),
        _ => rgb(0.0, 0.0, 0.6),
    }
}

/// Label/value rows of one vehicle block, in display order.
fn vehicle_rows(vehicle: &NewVehicle) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Plaque", vehicle.plate.clone()),
        ("Taille du véhicule", vehicle.size.as_str().to_string()),
        (
            "Téléphone du conducteur",
            format!("{} {}", vehicle.phone_code, vehicle.phone_number),
        ),
        ("Date d'arrivée prévue", vehicle.date.clone()),
        (
            "Heure d'arrivée prévue",
            if vehicle.time.is_empty() {
                "--:--".to_string()
            } else {
                vehicle.time.clone()
            },
        ),
        ("Ville de départ", vehicle.city.clone()),
        (
            "Type de déchargement",
            vehicle
                .unloading
                .iter()
                .map(|side| side.label())
                .collect::<Vec<_>>()
                .join(" / "),
        ),
    ];
    if let Some(kms) = &vehicle.kms {
        if !kms.is_empty() {
            rows.push(("Km parcourus", kms.clone()));
        }
    }
    rows
}

pub(crate) fn render_internal(
    payload: &CredentialPayload,
) -> Result<(PdfDocumentReference, RenderStats), RenderError> {
    let mut r = Renderer::new("Accréditation Véhicule")?;
    let mut stats = RenderStats::default();
    let black = rgb(0.0, 0.0, 0.0);
    let label_grey = rgb(0.15, 0.15, 0.15);

    // Header.
    r.text("Accréditation Véhicule", MARGIN, PAGE_HEIGHT - 50.0, 22.0, black.clone());
    r.text(
        "Palais des Festivals et des Congrès de Cannes",
        MARGIN,
        PAGE_HEIGHT - 75.0,
        14.0,
        black.clone(),
    );
    r.text(
        &format!("Date d'émission: {}", format_issue_date(Utc::now())),
        MARGIN,
        PAGE_HEIGHT - 95.0,
        10.0,
        black.clone(),
    );
    r.dashed_separator(PAGE_HEIGHT - 105.0);

    // General information.
    r.y = PAGE_HEIGHT - 130.0;
    r.text("Informations Générales de la Demande", MARGIN, r.y, 14.0, black.clone());
    r.y -= 25.0;

    r.label_value("Nom de l'entreprise", &payload.company, black.clone());
    r.label_value("Stand desservi", &payload.stand, black.clone());
    r.label_value(
        "Déchargement par",
        &payload.unloading.as_str().to_uppercase(),
        black.clone(),
    );

    let status = payload.status.unwrap_or(Status::Attente);
    r.text("Statut Actuel :", LABEL_X, r.y, 12.0, label_grey.clone());
    r.text(status.as_str(), VALUE_X, r.y, 12.0, status_color(status));
    r.y -= LINE_HEIGHT;

    let entry_text = payload.entry_at.map(format_timestamp).unwrap_or_else(|| {
        "L'accréditation doit être validée par un logisticien pour vous attribuer un horaire d'arrivée."
            .to_string()
    });
    r.label_value("Heure d'entrée", &entry_text, black.clone());
    let exit_text = payload.exit_at.map(format_timestamp).unwrap_or_else(|| {
        "Votre présence est tracée, un logisticien renseignera l'heure de votre départ.".to_string()
    });
    r.label_value("Heure de sortie", &exit_text, black.clone());

    r.y -= 10.0;
    r.dashed_separator(r.y);
    r.y -= 25.0;

    // Vehicle blocks.
    r.text("Détails des Véhicules Accrédités", MARGIN, r.y, 14.0, black.clone());
    r.y -= 25.0;

    for (index, vehicle) in payload.vehicles.iter().enumerate() {
        if r.y < PAGE_BREAK_THRESHOLD {
            r.new_page();
            r.text("Détails des Véhicules Accrédités", MARGIN, r.y, 14.0, black.clone());
            r.y -= 25.0;
        }

        let box_top = r.y;
        let mut y_box = r.y - BLOCK_PADDING;

        r.text(&format!("Véhicule {}", index + 1), LABEL_X, y_box, 12.0, rgb(0.1, 0.1, 0.1));
        y_box -= LINE_HEIGHT;

        for (label, value) in vehicle_rows(vehicle) {
            r.text(&format!("{label} :"), LABEL_X + BLOCK_PADDING, y_box, 12.0, label_grey.clone());
            y_box = r.text_wrapped(
                &value,
                VALUE_X,
                y_box,
                VALUE_MAX_WIDTH - BLOCK_PADDING,
                12.0,
                black.clone(),
            );
        }
        y_box -= BLOCK_PADDING;

        let box_bottom = y_box;
        r.layer.set_outline_color(rgb(0.8, 0.8, 0.8));
        r.layer.set_outline_thickness(1.0);
        r.layer.add_rect(
            Rect::new(
                mm(LABEL_X - BLOCK_PADDING),
                mm(box_bottom),
                mm(PAGE_WIDTH - 100.0 + BLOCK_PADDING),
                mm(box_top + 2.0 * BLOCK_PADDING),
            )
            .with_mode(PaintMode::Stroke),
        );
        stats
            .vehicle_spans
            .push((r.page, box_top + 2.0 * BLOCK_PADDING, box_bottom));

        // Space between vehicles.
        r.y = box_bottom - 30.0;
    }

    // Message & conditions.
    r.y -= 10.0;
    r.dashed_separator(r.y);
    r.y -= 25.0;

    r.text("Message et Conditions", MARGIN, r.y, 14.0, black.clone());
    r.y -= 25.0;

    r.text("Message d'intervention :", LABEL_X, r.y, 12.0, label_grey.clone());
    r.y -= LINE_HEIGHT;

    if !payload.message.is_empty() {
        // Character-level wrap so even unbroken tokens break; the box
        // is sized to the wrapped line count.
        let lines = wrap_chars(&payload.message, 11.0, VALUE_MAX_WIDTH - 16.0);
        let padding_y = 10.0;
        let padding_x = 8.0;
        let msg_height = lines.len() as f32 * 15.0 + padding_y * 2.0;

        r.layer.set_fill_color(rgb(1.0, 1.0, 0.9));
        r.layer.set_outline_color(rgb(0.9, 0.9, 0.7));
        r.layer.set_outline_thickness(1.0);
        r.layer.add_rect(
            Rect::new(
                mm(LABEL_X - 4.0),
                mm(r.y - msg_height + padding_y),
                mm(PAGE_WIDTH - 100.0 + 4.0),
                mm(r.y + padding_y),
            )
            .with_mode(PaintMode::FillStroke),
        );

        let mut y_msg = r.y - padding_y;
        for line in &lines {
            r.text(line, LABEL_X + padding_x, y_msg, 11.0, black.clone());
            y_msg -= 15.0;
        }
        r.y = r.y - msg_height - 10.0;
    } else {
        r.text("Aucun message.", LABEL_X, r.y, 11.0, rgb(0.4, 0.4, 0.4));
        r.y -= 20.0;
    }

    let consent_prefix = if payload.consent { "[X]" } else { "[ ]" };
    r.text(
        &format!("{consent_prefix} Je consens à la politique de confidentialité"),
        LABEL_X,
        r.y,
        12.0,
        black.clone(),
    );
    r.y -= 25.0;

    for note in [
        "Cette accréditation est valable pour une durée de 24 heures à compter de l'heure d'entrée validée.",
        "Veuillez présenter ce document à l'entrée du site.",
    ] {
        r.text(note, LABEL_X, r.y, 9.0, black.clone());
        r.y -= 12.0;
    }

    // QR code, bottom-right of the current page.
    if let Some(id) = payload.id {
        let data = serde_json::json!({ "id": id }).to_string();
        let code = QrCode::new(data.as_bytes())?;
        let width = code.width();
        let module = QR_SIZE / width as f32;
        let origin_x = PAGE_WIDTH - 100.0;
        let origin_y = 60.0;
        r.layer.set_fill_color(rgb(0.0, 0.0, 0.0));
        for (i, color) in code.to_colors().into_iter().enumerate() {
            if color == qrcode::Color::Dark {
                let col = (i % width) as f32;
                let row = (i / width) as f32;
                let x = origin_x + col * module;
                // QR rows count from the top; PDF y grows upward.
                let y = origin_y + QR_SIZE - (row + 1.0) * module;
                r.layer.add_rect(
                    Rect::new(mm(x), mm(y), mm(x + module), mm(y + module))
                        .with_mode(PaintMode::Fill),
                );
            }
        }
    }

    stats.pages = r.page + 1;
    Ok((r.doc, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quai_core::{UnloadingSide, VehicleSize};

    fn vehicle(plate: &str) -> NewVehicle {
        NewVehicle {
            plate: plate.to_string(),
            size: VehicleSize::From10To14,
            phone_code: "+33".to_string(),
            phone_number: "612345678".to_string(),
            date: "2025-05-01".to_string(),
            time: "09:00".to_string(),
            city: "Paris".to_string(),
            unloading: vec![UnloadingSide::Lat, UnloadingSide::Rear],
            kms: Some("420".to_string()),
        }
    }

    fn payload(vehicle_count: usize) -> CredentialPayload {
        CredentialPayload {
            id: Some(Uuid::new_v4()),
            company: "Acme Transports".to_string(),
            stand: "A1".to_string(),
            unloading: UnloadingProvider::Palais,
            event: EventKey::Festival,
            vehicles: (0..vehicle_count)
                .map(|i| vehicle(&format!("AB-{i:03}-CD")))
                .collect(),
            message: "Livraison fragile, merci de prévoir un transpalette.".to_string(),
            consent: true,
            status: Some(Status::Attente),
            entry_at: None,
            exit_at: None,
        }
    }

    #[test]
    fn renders_nonempty_pdf_bytes() {
        let bytes = render_credential(&payload(1)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn single_vehicle_fits_on_one_page() {
        let (_, stats) = render_internal(&payload(1)).unwrap();
        assert_eq!(stats.pages, 1);
    }

    #[test]
    fn many_vehicles_overflow_to_additional_pages() {
        let (_, stats) = render_internal(&payload(12)).unwrap();
        assert!(stats.pages > 1, "12 vehicle blocks must not fit one page");
    }

    #[test]
    fn vehicle_blocks_never_straddle_a_page_boundary() {
        let (_, stats) = render_internal(&payload(12)).unwrap();
        assert_eq!(stats.vehicle_spans.len(), 12);
        for (page, top, bottom) in stats.vehicle_spans {
            assert!(top > bottom);
            assert!(
                bottom > 0.0,
                "block on page {page} runs past the bottom edge (bottom={bottom})"
            );
            assert!(top < PAGE_HEIGHT);
        }
    }

    #[test]
    fn renders_without_id_and_without_message() {
        let mut p = payload(1);
        p.id = None;
        p.message = String::new();
        p.status = None;
        let bytes = render_credential(&p).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn issue_date_is_localized() {
        let date = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 8, 25, 10, 0, 0).unwrap();
        assert_eq!(format_issue_date(date), "25 août 2026");
    }
}

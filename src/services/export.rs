use chrono::{DateTime, SecondsFormat, Utc};
use rust_xlsxwriter::{Format, Workbook};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::{EventRepository, RegistrationRepository};
use crate::models::event::Event;
use crate::models::registration::RegistrationDetail;
use crate::services::auth::AuthUser;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    fn as_text(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }

    /// Text that a spreadsheet would evaluate as a formula is prefixed with
    /// a quote so it opens as a literal.
    fn as_csv_field(&self) -> String {
        match self {
            Cell::Text(text) if text.starts_with(['=', '+', '-', '@']) => format!("'{}", text),
            cell => cell.as_text(),
        }
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell::Text(text)
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.to_string())
    }
}

impl From<DateTime<Utc>> for Cell {
    fn from(at: DateTime<Utc>) -> Self {
        Cell::Text(at.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Cell::Number(f64::from(n))
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub sheet_name: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

pub fn render(table: &Table, format: ExportFormat) -> AppResult<Vec<u8>> {
    match format {
        ExportFormat::Csv => render_csv(table),
        ExportFormat::Xlsx => render_xlsx(table),
    }
}

fn render_csv(table: &Table) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers).map_err(AppError::internal)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(Cell::as_csv_field))
            .map_err(AppError::internal)?;
    }
    writer.into_inner().map_err(AppError::internal)
}

fn render_xlsx(table: &Table) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(table.sheet_name).map_err(AppError::internal)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(AppError::internal)?;
    }

    for (index, row) in table.rows.iter().enumerate() {
        let row_num = index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(text) => worksheet.write_string(row_num, col as u16, text.as_str()),
                Cell::Number(n) => worksheet.write_number(row_num, col as u16, *n),
            }
            .map_err(AppError::internal)?;
        }
    }
    worksheet.autofit();

    workbook.save_to_buffer().map_err(AppError::internal)
}

pub fn registrations_table(registrations: Vec<RegistrationDetail>) -> Table {
    Table {
        sheet_name: "Registrations",
        headers: vec![
            "Registration ID",
            "Volunteer",
            "Email",
            "Status",
            "Registered At",
            "Notes",
        ],
        rows: registrations
            .into_iter()
            .map(|r| {
                vec![
                    r.id.to_string().into(),
                    r.user_name.into(),
                    r.user_email.into(),
                    r.status.as_str().into(),
                    r.registered_at.into(),
                    r.notes.unwrap_or_default().into(),
                ]
            })
            .collect(),
    }
}

pub fn events_table(events: Vec<Event>) -> Table {
    Table {
        sheet_name: "Events",
        headers: vec![
            "Event ID",
            "Title",
            "Location",
            "Start Time",
            "Duration (min)",
            "Status",
            "Organizer",
            "Capacity",
            "Registered",
            "Available",
        ],
        rows: events
            .into_iter()
            .map(|e| {
                let available = e.available_spots();
                vec![
                    e.id.to_string().into(),
                    e.title.into(),
                    e.location.into(),
                    e.start_time.into(),
                    e.duration_minutes.into(),
                    e.status.as_str().into(),
                    e.organizer_name.into(),
                    e.capacity.into(),
                    e.registered_count.into(),
                    available.into(),
                ]
            })
            .collect(),
    }
}

#[derive(Clone)]
pub struct ExportService {
    events: EventRepository,
    registrations: RegistrationRepository,
}

impl ExportService {
    pub fn new(events: EventRepository, registrations: RegistrationRepository) -> Self {
        Self {
            events,
            registrations,
        }
    }

    pub async fn event_registrations(
        &self,
        actor: &AuthUser,
        event_id: Uuid,
        format: ExportFormat,
    ) -> AppResult<ExportFile> {
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;
        if !actor.can_manage_event(event.organizer_id) {
            return Err(AppError::Forbidden(
                "Only the organizer or an administrator can export registrations".to_string(),
            ));
        }

        let table = registrations_table(self.registrations.all_for_event(event_id).await?);
        tracing::info!(
            event_id = %event_id,
            rows = table.rows.len(),
            format = ?format,
            "Exporting registrations"
        );

        Ok(ExportFile {
            bytes: render(&table, format)?,
            content_type: format.content_type(),
            filename: format!("event-{}-registrations.{}", event_id, format.extension()),
        })
    }

    pub async fn events_report(&self, format: ExportFormat) -> AppResult<ExportFile> {
        let table = events_table(self.events.all().await?);
        tracing::info!(rows = table.rows.len(), format = ?format, "Exporting events report");

        Ok(ExportFile {
            bytes: render(&table, format)?,
            content_type: format.content_type(),
            filename: format!(
                "events-{}.{}",
                Utc::now().format("%Y%m%d"),
                format.extension()
            ),
        })
    }
}

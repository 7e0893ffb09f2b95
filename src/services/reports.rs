use crate::database::ReportRepository;
use crate::models::report::SummaryReport;
use crate::utils::error::AppResult;

#[derive(Clone)]
pub struct ReportService {
    reports: ReportRepository,
}

impl ReportService {
    pub fn new(reports: ReportRepository) -> Self {
        Self { reports }
    }

    pub async fn summary(&self) -> AppResult<SummaryReport> {
        Ok(self.reports.summary().await?)
    }
}

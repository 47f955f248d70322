use log::{info, warn};

use crate::{
    AttendanceExtractor, AttendanceResult, ExtractionError, TimetableExtractor, TimetableResult,
    config::{Credentials, DEFAULT_DAY_ORDER, DayOrderExtractor, PortalConfig},
    report::PortalReport,
    requests::PortalSession,
};

/// Everything needed to turn one set of credentials into a `PortalReport`.
///
/// The extractors are stateless and can be shared; each `scrape` call opens its
/// own `PortalSession`.
pub struct ScrapingContext {
    pub portal_config: PortalConfig,
    pub day_order_extractor: DayOrderExtractor,
    pub attendance_extractor: AttendanceExtractor,
    pub timetable_extractor: TimetableExtractor,
}

impl ScrapingContext {
    pub fn new(portal_config: PortalConfig) -> anyhow::Result<Self> {
        let day_order_extractor = DayOrderExtractor::new()?;
        let attendance_extractor = AttendanceExtractor::new()?;
        let timetable_extractor = TimetableExtractor::new()?;
        Ok(ScrapingContext {
            portal_config,
            day_order_extractor,
            attendance_extractor,
            timetable_extractor,
        })
    }

    /// lookup -> login -> day order -> attendance -> timetable -> logout, strictly in order.
    pub async fn scrape(&self, credentials: &Credentials) -> anyhow::Result<PortalReport> {
        let mut session = PortalSession::new(self.portal_config.clone())?;
        session.sign_in(credentials).await?;

        let day_order = self.fetch_day_order(&session).await;

        let attendance_page = session
            .fetch_page(&self.portal_config.attendance_page_url())
            .await;
        let timetable_page = session
            .fetch_page(&self.portal_config.timetable_page_url())
            .await;
        session.logout();

        Ok(self.build_report(attendance_page, day_order, timetable_page))
    }

    /// Extracts whichever pages arrived; a failed fetch only costs its own section.
    pub fn build_report(
        &self,
        attendance_page: anyhow::Result<String>,
        day_order: u32,
        timetable_page: anyhow::Result<String>,
    ) -> PortalReport {
        let attendance: Result<AttendanceResult, ExtractionError> = attendance_page
            .map_err(|e| ExtractionError::PageUnavailable(format!("{e:#}")))
            .and_then(|page| self.attendance_extractor.extract(&page));
        if let Err(e) = &attendance {
            warn!("attendance page: {e}");
        }
        let timetable: Result<TimetableResult, ExtractionError> = timetable_page
            .map_err(|e| ExtractionError::PageUnavailable(format!("{e:#}")))
            .and_then(|page| self.timetable_extractor.extract(&page));
        if let Err(e) = &timetable {
            warn!("timetable page: {e}");
        }

        PortalReport::new(attendance, day_order, timetable)
    }

    async fn fetch_day_order(&self, session: &PortalSession) -> u32 {
        let page = match session
            .fetch_page(&self.portal_config.welcome_page_url())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to fetch day order, using {DEFAULT_DAY_ORDER}: {e:#}");
                return DEFAULT_DAY_ORDER;
            }
        };
        match self.day_order_extractor.extract_day_order(&page) {
            Some(day_order) => {
                info!("Day Order retrieved: {day_order}");
                day_order
            }
            None => {
                warn!("Could not find day order in response, using {DEFAULT_DAY_ORDER}");
                DEFAULT_DAY_ORDER
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;

    #[test]
    fn test_failed_fetch_only_blanks_its_own_section() {
        let context = ScrapingContext::new(PortalConfig::new(None, None)).unwrap();
        let timetable_page = "<script>x.innerHTML = pageSanitizer.sanitize('\\x3Ctable\\x3E\\x3C/table\\x3E');</script>";

        let report = context.build_report(
            Err(anyhow!("connection reset")),
            DEFAULT_DAY_ORDER,
            Ok(timetable_page.to_string()),
        );
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["status"], "success");
        assert_eq!(
            value["attendance"],
            json!({"error": "could not fetch page: connection reset"})
        );
        assert_eq!(value["timetable"]["courses"], json!([]));
        assert_eq!(value["timetable"]["total_credits"], 0);
    }
}

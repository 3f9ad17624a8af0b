use crate::dto::HealthRes;

/// Health check behind `GET /health`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HealthService;

impl HealthService {
    /// Reports the service as alive, with the number of records currently held.
    pub fn check_health(records: usize) -> HealthRes {
        HealthRes {
            ok: true,
            message: "HealthDesk is alive".into(),
            records,
        }
    }
}

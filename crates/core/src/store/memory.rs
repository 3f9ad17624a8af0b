use super::Persistence;
use crate::record::PatientRecord;
use crate::PatientResult;

/// Keeps nothing outside the process. Every load starts empty and saves always succeed.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryBackend;

impl Persistence for MemoryBackend {
    fn load(&self) -> PatientResult<Vec<PatientRecord>> {
        Ok(Vec::new())
    }

    fn save(&self, _records: &[PatientRecord]) -> PatientResult<()> {
        Ok(())
    }
}

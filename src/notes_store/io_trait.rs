use uuid::Uuid;
use crate::rng::make_uuid;
use crate::timestamp::Timestamp;

pub trait NotesStoreIo: Send + Sync + 'static {
    fn now(&self) -> Timestamp;

    fn generate_uuid(&self) -> Uuid;
}

pub struct ProductionNotesStoreIo;

impl NotesStoreIo for ProductionNotesStoreIo {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn generate_uuid(&self) -> Uuid {
        make_uuid(&mut rand::rng())
    }
}

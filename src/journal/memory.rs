use anyhow::Result;

use crate::journal::{CounterEvent, EventJournal, FrameRecord, TemperatureSample};

/// In-memory journal for tests and diagnostics.
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    records: Vec<FrameRecord>,
    events: Vec<CounterEvent>,
    temperatures: Vec<TemperatureSample>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    pub fn events(&self) -> &[CounterEvent] {
        &self.events
    }

    pub fn temperatures(&self) -> &[TemperatureSample] {
        &self.temperatures
    }
}

impl EventJournal for InMemoryJournal {
    fn write_record(&mut self, record: &FrameRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn write_event(&mut self, event: &CounterEvent) -> Result<()> {
        self.events.push(event.clone());
        Ok(())
    }

    fn write_temperature(&mut self, sample: &TemperatureSample) -> Result<()> {
        self.temperatures.push(*sample);
        Ok(())
    }
}

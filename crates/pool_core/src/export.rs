//! Off-line bookkeeping export: resolved waitlist entries to Parquet, the
//! event log to JSON.

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, UInt32Array, UInt64Array, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::events::CoordinationEvent;
use crate::waitlist::{Assignment, UnassignedReason, WaitlistStore};

/// Writes one row per resolved entry; pending entries are skipped.
pub fn write_resolved_entries_parquet<P: AsRef<Path>>(
    path: P,
    waitlist: &WaitlistStore,
) -> Result<(), Box<dyn Error>> {
    let mut index = Vec::new();
    let mut passenger = Vec::new();
    let mut origin = Vec::new();
    let mut destination = Vec::new();
    let mut requested = Vec::new();
    let mut deposit = Vec::new();
    let mut outcome = Vec::new();
    let mut ride = Vec::new();
    let mut cost = Vec::new();
    let mut refund = Vec::new();
    let mut batch = Vec::new();

    for entry in waitlist.iter() {
        let Some(resolution) = entry.resolution else {
            continue;
        };
        index.push(entry.index.0);
        passenger.push(entry.passenger.0);
        origin.push(entry.route.origin.0);
        destination.push(entry.route.destination.0);
        requested.push(entry.requested);
        deposit.push(entry.deposit);
        outcome.push(outcome_code(resolution.assignment));
        ride.push(entry.assigned_ride().map(|r| r.0));
        cost.push(resolution.cost);
        refund.push(resolution.refund);
        batch.push(resolution.batch);
    }

    let schema = Schema::new(vec![
        Field::new("index", DataType::UInt64, false),
        Field::new("passenger", DataType::UInt64, false),
        Field::new("origin", DataType::UInt32, false),
        Field::new("destination", DataType::UInt32, false),
        Field::new("requested", DataType::UInt32, false),
        Field::new("deposit", DataType::UInt64, false),
        Field::new("outcome", DataType::UInt8, false),
        Field::new("ride", DataType::UInt64, true),
        Field::new("cost", DataType::UInt64, true),
        Field::new("refund", DataType::UInt64, false),
        Field::new("batch", DataType::UInt64, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(index)),
        Arc::new(UInt64Array::from(passenger)),
        Arc::new(UInt32Array::from(origin)),
        Arc::new(UInt32Array::from(destination)),
        Arc::new(UInt32Array::from(requested)),
        Arc::new(UInt64Array::from(deposit)),
        Arc::new(UInt8Array::from(outcome)),
        Arc::new(UInt64Array::from(ride)),
        Arc::new(UInt64Array::from(cost)),
        Arc::new(UInt64Array::from(refund)),
        Arc::new(UInt64Array::from(batch)),
    ];

    write_record_batch(path, schema, arrays)
}

/// Writes the event log as a JSON array, one tagged object per event.
pub fn write_events_json<P: AsRef<Path>>(
    path: P,
    events: &[CoordinationEvent],
) -> Result<(), Box<dyn Error>> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, events)?;
    Ok(())
}

fn write_record_batch<P: AsRef<Path>>(
    path: P,
    schema: Schema,
    arrays: Vec<ArrayRef>,
) -> Result<(), Box<dyn Error>> {
    let schema = Arc::new(schema);
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// 0 = assigned; 1.. = unassigned, by reason.
pub fn outcome_code(assignment: Assignment) -> u8 {
    match assignment {
        Assignment::Assigned(_) => 0,
        Assignment::Unassigned(UnassignedReason::NoRideOnRoute) => 1,
        Assignment::Unassigned(UnassignedReason::NoAffordableRide) => 2,
        Assignment::Unassigned(UnassignedReason::CapacityExhausted) => 3,
        Assignment::Unassigned(UnassignedReason::CapacityRace) => 4,
        Assignment::Unassigned(UnassignedReason::InsufficientDeposit) => 5,
    }
}

//! Proto ↔ engine conversion bridge.
//!
//! Converts between protobuf wire types (proto_types.rs) and the
//! engine's `DailyState`. The round trip is lossless: decoding what was
//! encoded yields an equal record, so ledger hashes survive storage.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use planting_engine::domain::{
    CostBreakdown, InventorySnapshot, Order, OrderLine, PlantingRecord, SpeciesInventory,
    TransportTrip, TripLoad,
};
use planting_engine::events::{AllocationSkip, DailyState, ProcurementSkip};

use crate::error::RuntimeError;
use crate::proto_types::*;

// ---------------------------------------------------------------------------
// Engine -> proto
// ---------------------------------------------------------------------------

pub fn daily_to_proto(record: &DailyState) -> ProtoDailyState {
    ProtoDailyState {
        day: record.day,
        date: record.date.format("%Y-%m-%d").to_string(),
        workday: record.workday,
        provider_turn: record.provider_turn.clone(),
        order: record.order.as_ref().map(order_to_proto),
        procurement_skip: record.procurement_skip.as_ref().map(procurement_skip_to_proto),
        arrivals: record.arrivals.iter().map(order_to_proto).collect(),
        trips: record.trips.iter().map(trip_to_proto).collect(),
        plantings: record
            .plantings
            .iter()
            .map(|p| ProtoPlanting {
                day: p.day,
                trip: p.trip,
                destination: p.destination,
                species: p.species,
                quantity: p.quantity,
                cost: p.cost,
            })
            .collect(),
        allocation_skip: record
            .allocation_skip
            .as_ref()
            .map(|s| allocation_skip_to_proto(s) as i32),
        excluded_destinations: record.excluded_destinations.clone(),
        labor_hours_used: record.labor_hours_used,
        inventory: record
            .inventory
            .species
            .iter()
            .map(|(&species, inv)| ProtoSpeciesInventory {
                species,
                stages: inv.stages.clone(),
                available: inv.available,
            })
            .collect(),
        day_cost: Some(ProtoCostBreakdown {
            purchase: record.day_cost.purchase,
            nursery_transport: record.day_cost.nursery_transport,
            planting: record.day_cost.planting,
        }),
        total_cost: record.total_cost,
        outstanding_demand: record.outstanding_demand,
    }
}

fn order_to_proto(order: &Order) -> ProtoOrder {
    ProtoOrder {
        provider: order.provider.clone(),
        lines: order
            .lines
            .iter()
            .map(|l| ProtoOrderLine {
                species: l.species,
                quantity: l.quantity,
                unit_cost: l.unit_cost,
            })
            .collect(),
        day_placed: order.day_placed,
        arrival_day: order.arrival_day,
        purchase_cost: order.purchase_cost,
        transport_cost: order.transport_cost,
    }
}

fn trip_to_proto(trip: &TransportTrip) -> ProtoTrip {
    ProtoTrip {
        day: trip.day,
        sequence: trip.sequence,
        destination: trip.destination,
        loads: trip
            .loads
            .iter()
            .map(|l| ProtoTripLoad {
                species: l.species,
                quantity: l.quantity,
            })
            .collect(),
        travel_hours: trip.travel_hours,
        handling_hours: trip.handling_hours,
        treatment_hours: trip.treatment_hours,
    }
}

fn procurement_skip_to_proto(skip: &ProcurementSkip) -> ProtoProcurementSkip {
    let kind = match skip {
        ProcurementSkip::NoViableProvider { provider } => {
            ProcurementSkipKind::NoViableProvider(ProviderRef {
                provider: provider.clone(),
            })
        }
        ProcurementSkip::WarehouseFull {
            occupancy,
            capacity,
        } => ProcurementSkipKind::WarehouseFull(WarehouseFull {
            occupancy: *occupancy,
            capacity: *capacity,
        }),
        ProcurementSkip::TargetMixSatisfied { provider } => {
            ProcurementSkipKind::TargetMixSatisfied(ProviderRef {
                provider: provider.clone(),
            })
        }
    };
    ProtoProcurementSkip { kind: Some(kind) }
}

fn allocation_skip_to_proto(skip: &AllocationSkip) -> AllocationSkipKind {
    match skip {
        AllocationSkip::NonWorkday => AllocationSkipKind::NonWorkday,
        AllocationSkip::NoPlantableInventory => AllocationSkipKind::NoPlantableInventory,
        AllocationSkip::NoViableDestination => AllocationSkipKind::NoViableDestination,
    }
}

// ---------------------------------------------------------------------------
// Proto -> engine
// ---------------------------------------------------------------------------

/// Strict decode. Missing required sub-messages are corruption, not defaults.
pub fn proto_to_daily(proto: &ProtoDailyState) -> Result<DailyState, RuntimeError> {
    let date = NaiveDate::parse_from_str(&proto.date, "%Y-%m-%d")
        .map_err(|e| corrupt(proto.day, format!("bad date {:?}: {}", proto.date, e)))?;
    let day_cost = proto
        .day_cost
        .as_ref()
        .ok_or_else(|| corrupt(proto.day, "missing day_cost"))?;

    let mut inventory = BTreeMap::new();
    for inv in &proto.inventory {
        let previous = inventory.insert(
            inv.species,
            SpeciesInventory {
                stages: inv.stages.clone(),
                available: inv.available,
            },
        );
        if previous.is_some() {
            return Err(corrupt(
                proto.day,
                format!("species {} listed twice in inventory", inv.species),
            ));
        }
    }

    Ok(DailyState {
        day: proto.day,
        date,
        workday: proto.workday,
        provider_turn: proto.provider_turn.clone(),
        order: proto.order.as_ref().map(proto_to_order),
        procurement_skip: proto
            .procurement_skip
            .as_ref()
            .map(|s| proto_to_procurement_skip(proto.day, s))
            .transpose()?,
        arrivals: proto.arrivals.iter().map(proto_to_order).collect(),
        trips: proto.trips.iter().map(proto_to_trip).collect(),
        plantings: proto
            .plantings
            .iter()
            .map(|p| PlantingRecord {
                day: p.day,
                trip: p.trip,
                destination: p.destination,
                species: p.species,
                quantity: p.quantity,
                cost: p.cost,
            })
            .collect(),
        allocation_skip: proto
            .allocation_skip
            .map(|raw| proto_to_allocation_skip(proto.day, raw))
            .transpose()?,
        excluded_destinations: proto.excluded_destinations.clone(),
        labor_hours_used: proto.labor_hours_used,
        inventory: InventorySnapshot { species: inventory },
        day_cost: CostBreakdown {
            purchase: day_cost.purchase,
            nursery_transport: day_cost.nursery_transport,
            planting: day_cost.planting,
        },
        total_cost: proto.total_cost,
        outstanding_demand: proto.outstanding_demand,
    })
}

fn proto_to_order(proto: &ProtoOrder) -> Order {
    Order {
        provider: proto.provider.clone(),
        lines: proto
            .lines
            .iter()
            .map(|l| OrderLine {
                species: l.species,
                quantity: l.quantity,
                unit_cost: l.unit_cost,
            })
            .collect(),
        day_placed: proto.day_placed,
        arrival_day: proto.arrival_day,
        purchase_cost: proto.purchase_cost,
        transport_cost: proto.transport_cost,
    }
}

fn proto_to_trip(proto: &ProtoTrip) -> TransportTrip {
    TransportTrip {
        day: proto.day,
        sequence: proto.sequence,
        destination: proto.destination,
        loads: proto
            .loads
            .iter()
            .map(|l| TripLoad {
                species: l.species,
                quantity: l.quantity,
            })
            .collect(),
        travel_hours: proto.travel_hours,
        handling_hours: proto.handling_hours,
        treatment_hours: proto.treatment_hours,
    }
}

fn proto_to_procurement_skip(
    day: u32,
    proto: &ProtoProcurementSkip,
) -> Result<ProcurementSkip, RuntimeError> {
    match proto.kind.as_ref() {
        Some(ProcurementSkipKind::NoViableProvider(p)) => Ok(ProcurementSkip::NoViableProvider {
            provider: p.provider.clone(),
        }),
        Some(ProcurementSkipKind::WarehouseFull(w)) => Ok(ProcurementSkip::WarehouseFull {
            occupancy: w.occupancy,
            capacity: w.capacity,
        }),
        Some(ProcurementSkipKind::TargetMixSatisfied(p)) => {
            Ok(ProcurementSkip::TargetMixSatisfied {
                provider: p.provider.clone(),
            })
        }
        None => Err(corrupt(day, "procurement skip without a kind")),
    }
}

fn proto_to_allocation_skip(day: u32, raw: i32) -> Result<AllocationSkip, RuntimeError> {
    match AllocationSkipKind::try_from(raw) {
        Ok(AllocationSkipKind::NonWorkday) => Ok(AllocationSkip::NonWorkday),
        Ok(AllocationSkipKind::NoPlantableInventory) => Ok(AllocationSkip::NoPlantableInventory),
        Ok(AllocationSkipKind::NoViableDestination) => Ok(AllocationSkip::NoViableDestination),
        Ok(AllocationSkipKind::Unspecified) | Err(_) => {
            Err(corrupt(day, format!("unknown allocation skip {}", raw)))
        }
    }
}

fn corrupt(day: u32, detail: impl Into<String>) -> RuntimeError {
    RuntimeError::Corrupt(format!("day {}: {}", day, detail.into()))
}

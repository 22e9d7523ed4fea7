//! Hand-written protobuf types for the daily ledger.
//!
//! Uses prost derive macros for encode/decode without prost-build.
//! Field numbers are part of the on-disk format; never renumber.

use prost::Message;

// ── Ledger Record ──────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoDailyState {
    #[prost(uint32, tag = "1")]
    pub day: u32,
    /// ISO-8601 calendar date.
    #[prost(string, tag = "2")]
    pub date: String,
    #[prost(bool, tag = "3")]
    pub workday: bool,
    #[prost(string, tag = "4")]
    pub provider_turn: String,
    #[prost(message, optional, tag = "5")]
    pub order: Option<ProtoOrder>,
    #[prost(message, optional, tag = "6")]
    pub procurement_skip: Option<ProtoProcurementSkip>,
    #[prost(message, repeated, tag = "7")]
    pub arrivals: Vec<ProtoOrder>,
    #[prost(message, repeated, tag = "8")]
    pub trips: Vec<ProtoTrip>,
    #[prost(message, repeated, tag = "9")]
    pub plantings: Vec<ProtoPlanting>,
    #[prost(enumeration = "AllocationSkipKind", optional, tag = "10")]
    pub allocation_skip: Option<i32>,
    #[prost(uint32, repeated, tag = "11")]
    pub excluded_destinations: Vec<u32>,
    #[prost(int64, tag = "12")]
    pub labor_hours_used: i64,
    #[prost(message, repeated, tag = "13")]
    pub inventory: Vec<ProtoSpeciesInventory>,
    #[prost(message, optional, tag = "14")]
    pub day_cost: Option<ProtoCostBreakdown>,
    #[prost(int64, tag = "15")]
    pub total_cost: i64,
    #[prost(uint64, tag = "16")]
    pub outstanding_demand: u64,
}

// ── Orders ─────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoOrder {
    #[prost(string, tag = "1")]
    pub provider: String,
    #[prost(message, repeated, tag = "2")]
    pub lines: Vec<ProtoOrderLine>,
    #[prost(uint32, tag = "3")]
    pub day_placed: u32,
    #[prost(uint32, tag = "4")]
    pub arrival_day: u32,
    #[prost(int64, tag = "5")]
    pub purchase_cost: i64,
    #[prost(int64, tag = "6")]
    pub transport_cost: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoOrderLine {
    #[prost(uint32, tag = "1")]
    pub species: u32,
    #[prost(uint64, tag = "2")]
    pub quantity: u64,
    #[prost(int64, tag = "3")]
    pub unit_cost: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoProcurementSkip {
    #[prost(oneof = "ProcurementSkipKind", tags = "1, 2, 3")]
    pub kind: Option<ProcurementSkipKind>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum ProcurementSkipKind {
    #[prost(message, tag = "1")]
    NoViableProvider(ProviderRef),
    #[prost(message, tag = "2")]
    WarehouseFull(WarehouseFull),
    #[prost(message, tag = "3")]
    TargetMixSatisfied(ProviderRef),
}

#[derive(Clone, PartialEq, Message)]
pub struct ProviderRef {
    #[prost(string, tag = "1")]
    pub provider: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct WarehouseFull {
    #[prost(uint64, tag = "1")]
    pub occupancy: u64,
    #[prost(uint64, tag = "2")]
    pub capacity: u64,
}

// ── Trips and Plantings ────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoTrip {
    #[prost(uint32, tag = "1")]
    pub day: u32,
    #[prost(uint32, tag = "2")]
    pub sequence: u32,
    #[prost(uint32, tag = "3")]
    pub destination: u32,
    #[prost(message, repeated, tag = "4")]
    pub loads: Vec<ProtoTripLoad>,
    #[prost(int64, tag = "5")]
    pub travel_hours: i64,
    #[prost(int64, tag = "6")]
    pub handling_hours: i64,
    #[prost(int64, tag = "7")]
    pub treatment_hours: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoTripLoad {
    #[prost(uint32, tag = "1")]
    pub species: u32,
    #[prost(uint64, tag = "2")]
    pub quantity: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoPlanting {
    #[prost(uint32, tag = "1")]
    pub day: u32,
    #[prost(uint32, tag = "2")]
    pub trip: u32,
    #[prost(uint32, tag = "3")]
    pub destination: u32,
    #[prost(uint32, tag = "4")]
    pub species: u32,
    #[prost(uint64, tag = "5")]
    pub quantity: u64,
    #[prost(int64, tag = "6")]
    pub cost: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum AllocationSkipKind {
    Unspecified = 0,
    NonWorkday = 1,
    NoPlantableInventory = 2,
    NoViableDestination = 3,
}

// ── Inventory and Cost ─────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoSpeciesInventory {
    #[prost(uint32, tag = "1")]
    pub species: u32,
    #[prost(uint64, repeated, tag = "2")]
    pub stages: Vec<u64>,
    #[prost(uint64, tag = "3")]
    pub available: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoCostBreakdown {
    #[prost(int64, tag = "1")]
    pub purchase: i64,
    #[prost(int64, tag = "2")]
    pub nursery_transport: i64,
    #[prost(int64, tag = "3")]
    pub planting: i64,
}

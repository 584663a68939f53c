//! OTLP protobuf messages.
//!
//! The subset of `opentelemetry/proto` (v1) this crate sends, declared with
//! `prost` derives. Field numbers match the upstream `.proto` definitions.

#![allow(missing_docs)]
#![allow(clippy::doc_markdown)]

pub mod common {
    pub mod v1 {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct AnyValue {
            #[prost(oneof = "any_value::Value", tags = "1, 2, 3, 4, 5, 6, 7")]
            pub value: ::core::option::Option<any_value::Value>,
        }

        pub mod any_value {
            #[derive(Clone, PartialEq, ::prost::Oneof)]
            pub enum Value {
                #[prost(string, tag = "1")]
                StringValue(::prost::alloc::string::String),
                #[prost(bool, tag = "2")]
                BoolValue(bool),
                #[prost(int64, tag = "3")]
                IntValue(i64),
                #[prost(double, tag = "4")]
                DoubleValue(f64),
                #[prost(message, tag = "5")]
                ArrayValue(super::ArrayValue),
                #[prost(message, tag = "6")]
                KvlistValue(super::KeyValueList),
                #[prost(bytes, tag = "7")]
                BytesValue(::prost::alloc::vec::Vec<u8>),
            }
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ArrayValue {
            #[prost(message, repeated, tag = "1")]
            pub values: ::prost::alloc::vec::Vec<AnyValue>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct KeyValueList {
            #[prost(message, repeated, tag = "1")]
            pub values: ::prost::alloc::vec::Vec<KeyValue>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct KeyValue {
            #[prost(string, tag = "1")]
            pub key: ::prost::alloc::string::String,
            #[prost(message, optional, tag = "2")]
            pub value: ::core::option::Option<AnyValue>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct InstrumentationScope {
            #[prost(string, tag = "1")]
            pub name: ::prost::alloc::string::String,
            #[prost(string, tag = "2")]
            pub version: ::prost::alloc::string::String,
            #[prost(message, repeated, tag = "3")]
            pub attributes: ::prost::alloc::vec::Vec<KeyValue>,
            #[prost(uint32, tag = "4")]
            pub dropped_attributes_count: u32,
        }
    }
}

pub mod resource {
    pub mod v1 {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Resource {
            #[prost(message, repeated, tag = "1")]
            pub attributes: ::prost::alloc::vec::Vec<super::super::common::v1::KeyValue>,
            #[prost(uint32, tag = "2")]
            pub dropped_attributes_count: u32,
        }
    }
}

pub mod trace {
    pub mod v1 {
        use super::super::common::v1::{InstrumentationScope, KeyValue};
        use super::super::resource::v1::Resource;

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ResourceSpans {
            #[prost(message, optional, tag = "1")]
            pub resource: ::core::option::Option<Resource>,
            #[prost(message, repeated, tag = "2")]
            pub scope_spans: ::prost::alloc::vec::Vec<ScopeSpans>,
            #[prost(string, tag = "3")]
            pub schema_url: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ScopeSpans {
            #[prost(message, optional, tag = "1")]
            pub scope: ::core::option::Option<InstrumentationScope>,
            #[prost(message, repeated, tag = "2")]
            pub spans: ::prost::alloc::vec::Vec<Span>,
            #[prost(string, tag = "3")]
            pub schema_url: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Span {
            #[prost(bytes = "vec", tag = "1")]
            pub trace_id: ::prost::alloc::vec::Vec<u8>,
            #[prost(bytes = "vec", tag = "2")]
            pub span_id: ::prost::alloc::vec::Vec<u8>,
            #[prost(string, tag = "3")]
            pub trace_state: ::prost::alloc::string::String,
            #[prost(bytes = "vec", tag = "4")]
            pub parent_span_id: ::prost::alloc::vec::Vec<u8>,
            #[prost(fixed32, tag = "16")]
            pub flags: u32,
            #[prost(string, tag = "5")]
            pub name: ::prost::alloc::string::String,
            #[prost(enumeration = "span::SpanKind", tag = "6")]
            pub kind: i32,
            #[prost(fixed64, tag = "7")]
            pub start_time_unix_nano: u64,
            #[prost(fixed64, tag = "8")]
            pub end_time_unix_nano: u64,
            #[prost(message, repeated, tag = "9")]
            pub attributes: ::prost::alloc::vec::Vec<KeyValue>,
            #[prost(uint32, tag = "10")]
            pub dropped_attributes_count: u32,
            #[prost(message, repeated, tag = "11")]
            pub events: ::prost::alloc::vec::Vec<span::Event>,
            #[prost(uint32, tag = "12")]
            pub dropped_events_count: u32,
            #[prost(message, optional, tag = "15")]
            pub status: ::core::option::Option<Status>,
        }

        pub mod span {
            use super::KeyValue;

            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct Event {
                #[prost(fixed64, tag = "1")]
                pub time_unix_nano: u64,
                #[prost(string, tag = "2")]
                pub name: ::prost::alloc::string::String,
                #[prost(message, repeated, tag = "3")]
                pub attributes: ::prost::alloc::vec::Vec<KeyValue>,
                #[prost(uint32, tag = "4")]
                pub dropped_attributes_count: u32,
            }

            #[derive(
                Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
            )]
            #[repr(i32)]
            pub enum SpanKind {
                Unspecified = 0,
                Internal = 1,
                Server = 2,
                Client = 3,
                Producer = 4,
                Consumer = 5,
            }
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Status {
            #[prost(string, tag = "2")]
            pub message: ::prost::alloc::string::String,
            #[prost(enumeration = "status::StatusCode", tag = "3")]
            pub code: i32,
        }

        pub mod status {
            #[derive(
                Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
            )]
            #[repr(i32)]
            pub enum StatusCode {
                Unset = 0,
                Ok = 1,
                Error = 2,
            }
        }
    }
}

pub mod logs {
    pub mod v1 {
        use super::super::common::v1::{AnyValue, InstrumentationScope, KeyValue};
        use super::super::resource::v1::Resource;

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ResourceLogs {
            #[prost(message, optional, tag = "1")]
            pub resource: ::core::option::Option<Resource>,
            #[prost(message, repeated, tag = "2")]
            pub scope_logs: ::prost::alloc::vec::Vec<ScopeLogs>,
            #[prost(string, tag = "3")]
            pub schema_url: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ScopeLogs {
            #[prost(message, optional, tag = "1")]
            pub scope: ::core::option::Option<InstrumentationScope>,
            #[prost(message, repeated, tag = "2")]
            pub log_records: ::prost::alloc::vec::Vec<LogRecord>,
            #[prost(string, tag = "3")]
            pub schema_url: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct LogRecord {
            #[prost(fixed64, tag = "1")]
            pub time_unix_nano: u64,
            #[prost(fixed64, tag = "11")]
            pub observed_time_unix_nano: u64,
            #[prost(int32, tag = "2")]
            pub severity_number: i32,
            #[prost(string, tag = "3")]
            pub severity_text: ::prost::alloc::string::String,
            #[prost(message, optional, tag = "5")]
            pub body: ::core::option::Option<AnyValue>,
            #[prost(message, repeated, tag = "6")]
            pub attributes: ::prost::alloc::vec::Vec<KeyValue>,
            #[prost(uint32, tag = "7")]
            pub dropped_attributes_count: u32,
            #[prost(fixed32, tag = "8")]
            pub flags: u32,
            #[prost(bytes = "vec", tag = "9")]
            pub trace_id: ::prost::alloc::vec::Vec<u8>,
            #[prost(bytes = "vec", tag = "10")]
            pub span_id: ::prost::alloc::vec::Vec<u8>,
        }
    }
}

pub mod metrics {
    pub mod v1 {
        use super::super::common::v1::{InstrumentationScope, KeyValue};
        use super::super::resource::v1::Resource;

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ResourceMetrics {
            #[prost(message, optional, tag = "1")]
            pub resource: ::core::option::Option<Resource>,
            #[prost(message, repeated, tag = "2")]
            pub scope_metrics: ::prost::alloc::vec::Vec<ScopeMetrics>,
            #[prost(string, tag = "3")]
            pub schema_url: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ScopeMetrics {
            #[prost(message, optional, tag = "1")]
            pub scope: ::core::option::Option<InstrumentationScope>,
            #[prost(message, repeated, tag = "2")]
            pub metrics: ::prost::alloc::vec::Vec<Metric>,
            #[prost(string, tag = "3")]
            pub schema_url: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Metric {
            #[prost(string, tag = "1")]
            pub name: ::prost::alloc::string::String,
            #[prost(string, tag = "2")]
            pub description: ::prost::alloc::string::String,
            #[prost(string, tag = "3")]
            pub unit: ::prost::alloc::string::String,
            #[prost(oneof = "metric::Data", tags = "5, 7, 9")]
            pub data: ::core::option::Option<metric::Data>,
        }

        pub mod metric {
            #[derive(Clone, PartialEq, ::prost::Oneof)]
            pub enum Data {
                #[prost(message, tag = "5")]
                Gauge(super::Gauge),
                #[prost(message, tag = "7")]
                Sum(super::Sum),
                #[prost(message, tag = "9")]
                Histogram(super::Histogram),
            }
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Gauge {
            #[prost(message, repeated, tag = "1")]
            pub data_points: ::prost::alloc::vec::Vec<NumberDataPoint>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Sum {
            #[prost(message, repeated, tag = "1")]
            pub data_points: ::prost::alloc::vec::Vec<NumberDataPoint>,
            #[prost(enumeration = "AggregationTemporality", tag = "2")]
            pub aggregation_temporality: i32,
            #[prost(bool, tag = "3")]
            pub is_monotonic: bool,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Histogram {
            #[prost(message, repeated, tag = "1")]
            pub data_points: ::prost::alloc::vec::Vec<HistogramDataPoint>,
            #[prost(enumeration = "AggregationTemporality", tag = "2")]
            pub aggregation_temporality: i32,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct NumberDataPoint {
            #[prost(message, repeated, tag = "7")]
            pub attributes: ::prost::alloc::vec::Vec<KeyValue>,
            #[prost(fixed64, tag = "2")]
            pub start_time_unix_nano: u64,
            #[prost(fixed64, tag = "3")]
            pub time_unix_nano: u64,
            #[prost(uint32, tag = "8")]
            pub flags: u32,
            #[prost(oneof = "number_data_point::Value", tags = "4, 6")]
            pub value: ::core::option::Option<number_data_point::Value>,
        }

        pub mod number_data_point {
            #[derive(Clone, Copy, PartialEq, ::prost::Oneof)]
            pub enum Value {
                #[prost(double, tag = "4")]
                AsDouble(f64),
                #[prost(sfixed64, tag = "6")]
                AsInt(i64),
            }
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct HistogramDataPoint {
            #[prost(message, repeated, tag = "9")]
            pub attributes: ::prost::alloc::vec::Vec<KeyValue>,
            #[prost(fixed64, tag = "2")]
            pub start_time_unix_nano: u64,
            #[prost(fixed64, tag = "3")]
            pub time_unix_nano: u64,
            #[prost(fixed64, tag = "4")]
            pub count: u64,
            #[prost(double, optional, tag = "5")]
            pub sum: ::core::option::Option<f64>,
            #[prost(fixed64, repeated, tag = "6")]
            pub bucket_counts: ::prost::alloc::vec::Vec<u64>,
            #[prost(double, repeated, tag = "7")]
            pub explicit_bounds: ::prost::alloc::vec::Vec<f64>,
            #[prost(uint32, tag = "10")]
            pub flags: u32,
            #[prost(double, optional, tag = "11")]
            pub min: ::core::option::Option<f64>,
            #[prost(double, optional, tag = "12")]
            pub max: ::core::option::Option<f64>,
        }

        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
        )]
        #[repr(i32)]
        pub enum AggregationTemporality {
            Unspecified = 0,
            Delta = 1,
            Cumulative = 2,
        }
    }
}

pub mod collector {
    pub mod trace {
        pub mod v1 {
            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct ExportTraceServiceRequest {
                #[prost(message, repeated, tag = "1")]
                pub resource_spans:
                    ::prost::alloc::vec::Vec<super::super::super::trace::v1::ResourceSpans>,
            }

            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct ExportTraceServiceResponse {
                #[prost(message, optional, tag = "1")]
                pub partial_success: ::core::option::Option<ExportTracePartialSuccess>,
            }

            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct ExportTracePartialSuccess {
                #[prost(int64, tag = "1")]
                pub rejected_spans: i64,
                #[prost(string, tag = "2")]
                pub error_message: ::prost::alloc::string::String,
            }
        }
    }

    pub mod logs {
        pub mod v1 {
            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct ExportLogsServiceRequest {
                #[prost(message, repeated, tag = "1")]
                pub resource_logs:
                    ::prost::alloc::vec::Vec<super::super::super::logs::v1::ResourceLogs>,
            }

            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct ExportLogsServiceResponse {
                #[prost(message, optional, tag = "1")]
                pub partial_success: ::core::option::Option<ExportLogsPartialSuccess>,
            }

            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct ExportLogsPartialSuccess {
                #[prost(int64, tag = "1")]
                pub rejected_log_records: i64,
                #[prost(string, tag = "2")]
                pub error_message: ::prost::alloc::string::String,
            }
        }
    }

    pub mod metrics {
        pub mod v1 {
            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct ExportMetricsServiceRequest {
                #[prost(message, repeated, tag = "1")]
                pub resource_metrics:
                    ::prost::alloc::vec::Vec<super::super::super::metrics::v1::ResourceMetrics>,
            }

            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct ExportMetricsServiceResponse {
                #[prost(message, optional, tag = "1")]
                pub partial_success: ::core::option::Option<ExportMetricsPartialSuccess>,
            }

            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct ExportMetricsPartialSuccess {
                #[prost(int64, tag = "1")]
                pub rejected_data_points: i64,
                #[prost(string, tag = "2")]
                pub error_message: ::prost::alloc::string::String,
            }
        }
    }
}

//! Arrow type names and the Postgres column types an ADBC Postgres driver
//! picks for them when preparing a parameterized statement.

use arrow_schema::{DataType, TimeUnit};

/// Short type name in the format C-data-interface tooling prints (nanoarrow's
/// `ArrowTypeString`). The no-type marker prints as `na`.
pub fn arrow_type_label(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Null => "na",
        DataType::Boolean => "bool",
        DataType::Int8 => "int8",
        DataType::Int16 => "int16",
        DataType::Int32 => "int32",
        DataType::Int64 => "int64",
        DataType::UInt8 => "uint8",
        DataType::UInt16 => "uint16",
        DataType::UInt32 => "uint32",
        DataType::UInt64 => "uint64",
        DataType::Float16 => "half_float",
        DataType::Float32 => "float",
        DataType::Float64 => "double",
        DataType::Utf8 => "string",
        DataType::LargeUtf8 => "large_string",
        DataType::Utf8View => "string_view",
        DataType::Binary => "binary",
        DataType::LargeBinary => "large_binary",
        DataType::BinaryView => "binary_view",
        DataType::FixedSizeBinary(_) => "fixed_size_binary",
        DataType::Date32 => "date32",
        DataType::Date64 => "date64",
        DataType::Time32(_) => "time32",
        DataType::Time64(_) => "time64",
        DataType::Timestamp(_, _) => "timestamp",
        DataType::Duration(_) => "duration",
        DataType::Interval(_) => "interval",
        DataType::Decimal128(_, _) => "decimal128",
        DataType::Decimal256(_, _) => "decimal256",
        DataType::List(_) => "list",
        DataType::LargeList(_) => "large_list",
        DataType::FixedSizeList(_, _) => "fixed_size_list",
        DataType::Struct(_) => "struct",
        DataType::Map(_, _) => "map",
        DataType::Dictionary(_, _) => "dictionary",
        _ => "unknown",
    }
}

/// Postgres column type an unpatched Postgres driver binds `data_type` as.
///
/// `None` means the driver rejects the parameter with
/// `Can't map Arrow type '<label>' to Postgres type`. The no-type marker
/// (`DataType::Null`) has no mapping.
pub fn postgres_type_for(data_type: &DataType) -> Option<String> {
    let name = match data_type {
        DataType::Boolean => "boolean",
        DataType::Int8 | DataType::UInt8 | DataType::Int16 => "int2",
        DataType::UInt16 | DataType::Int32 => "int4",
        DataType::UInt32 | DataType::Int64 => "int8",
        DataType::Float16 | DataType::Float32 => "float4",
        DataType::Float64 => "float8",
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "text",
        DataType::Binary
        | DataType::LargeBinary
        | DataType::BinaryView
        | DataType::FixedSizeBinary(_) => "bytea",
        DataType::Date32 => "date",
        DataType::Time64(TimeUnit::Microsecond) => "time",
        DataType::Timestamp(_, None) => "timestamp",
        DataType::Timestamp(_, Some(_)) => "timestamptz",
        DataType::Duration(_) | DataType::Interval(_) => "interval",
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => "numeric",
        DataType::Dictionary(_, value) => return postgres_type_for(value),
        DataType::List(item) | DataType::LargeList(item) | DataType::FixedSizeList(item, _) => {
            return postgres_type_for(item.data_type()).map(|inner| format!("{inner}[]"));
        }
        _ => return None,
    };
    Some(name.to_string())
}

/// The message an unpatched Postgres driver reports for an unmappable type.
pub fn unmappable_type_message(data_type: &DataType) -> String {
    format!(
        "Can't map Arrow type '{}' to Postgres type",
        arrow_type_label(data_type)
    )
}

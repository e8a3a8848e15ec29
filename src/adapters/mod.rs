//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements         | Connects to              |
//! |---------------|--------------------|--------------------------|
//! | `config_file` | ConfigPort         | JSON file on disk        |
//! | `log_sink`    | EventSink          | `log` facade             |
//! | `memory`      | DemandPort         | In-memory device maps    |
//! |               | OverridePort       |                          |
//! |               | ResponsePort       |                          |
//! |               | EquipmentPort      |                          |
//! | `time`        | Clock              | `Instant` / manual clock |

pub mod config_file;
pub mod log_sink;
pub mod memory;
pub mod time;

//! Declarative helpers for the crate's code tables.

/// Defines numeric error code constants and a `get_error_message` lookup.
macro_rules! define_error_codes {
    ($($name:ident = $code:literal => $msg:literal),* $(,)?) => {
        $(
            #[doc = $msg]
            pub const $name: u32 = $code;
        )*

        /// Returns the human readable message for an error code.
        pub fn get_error_message(code: u32) -> &'static str {
            match code {
                $($code => $msg,)*
                _ => "Unknown Error",
            }
        }
    };
}

/// Defines the `FunctionCode` enum addressing a device attribute in a command.
macro_rules! define_function_code {
    ($($name:ident = $val:literal),* $(,)?) => {
        /// Opcode selecting which device attribute a command targets.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum FunctionCode {
            $($name = $val,)*
        }

        impl FunctionCode {
            pub fn from_u32(value: u32) -> Option<Self> {
                match value {
                    $($val => Some(FunctionCode::$name),)*
                    _ => None,
                }
            }

            pub fn code(self) -> u32 {
                self as u32
            }
        }

        impl From<FunctionCode> for u32 {
            fn from(f: FunctionCode) -> u32 {
                f as u32
            }
        }
    };
}

/// Defines the `DeviceType` enum with its numeric codes and capability sets.
///
/// Codes not listed resolve to `DeviceType::Unknown(code)` with no capabilities.
macro_rules! define_device_type {
    ($($name:ident = $code:literal => $caps:expr),* $(,)?) => {
        /// Device class reported by the cloud inventory.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum DeviceType {
            $($name,)*
            Unknown(u32),
        }

        impl DeviceType {
            pub fn from_code(code: u32) -> Self {
                match code {
                    $($code => DeviceType::$name,)*
                    other => DeviceType::Unknown(other),
                }
            }

            pub fn code(&self) -> u32 {
                match self {
                    $(DeviceType::$name => $code,)*
                    DeviceType::Unknown(code) => *code,
                }
            }

            pub fn capabilities(&self) -> Capabilities {
                match self {
                    $(DeviceType::$name => $caps,)*
                    DeviceType::Unknown(_) => Capabilities::NONE,
                }
            }
        }
    };
}

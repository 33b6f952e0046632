use std::str::FromStr;

use crate::codec::ByteOrder;

/// Closed set of console commands. The engine dispatches exhaustively over
/// this enum; a name that does not parse is reported as unrecognized and the
/// queue advances.
///
/// The `fcN` names follow the Modbus function codes; float variants append a
/// [`ByteOrder`] suffix (`fc3b`, `fc3bb`, `fc3l`, `fc3lb`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Terminate the session, discarding any queued jobs.
    Exit,
    /// Emit the arguments back as an `info` event.
    Echo,
    /// Suspend the queue for the given number of milliseconds.
    Delay,
    /// fc1: read coils.
    ReadCoils,
    /// fc2: read discrete inputs.
    ReadDiscreteInputs,
    /// fc3: read holding registers.
    ReadHolding,
    /// fc4: read input registers.
    ReadInput,
    /// fc5: write a single coil.
    WriteCoil,
    /// fc6: write a single register.
    WriteRegister,
    /// fc15: write multiple coils.
    WriteCoils,
    /// fc16: write multiple registers.
    WriteRegisters,
    /// fc3 wrapped through the float codec.
    ReadHoldingFloats(ByteOrder),
    /// fc4 wrapped through the float codec.
    ReadInputFloats(ByteOrder),
    /// fc16 taking floats, encoded through the codec before the write.
    WriteFloats(ByteOrder),
}

impl FromStr for CommandKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exit" => Ok(Self::Exit),
            "echo" => Ok(Self::Echo),
            "delay" => Ok(Self::Delay),
            "fc1" => Ok(Self::ReadCoils),
            "fc2" => Ok(Self::ReadDiscreteInputs),
            "fc3" => Ok(Self::ReadHolding),
            "fc4" => Ok(Self::ReadInput),
            "fc5" => Ok(Self::WriteCoil),
            "fc6" => Ok(Self::WriteRegister),
            "fc15" => Ok(Self::WriteCoils),
            "fc16" => Ok(Self::WriteRegisters),
            other => {
                // float variants: base name plus byte-order suffix
                if let Some(sfx) = other.strip_prefix("fc16") {
                    sfx.parse().map(Self::WriteFloats)
                } else if let Some(sfx) = other.strip_prefix("fc3") {
                    sfx.parse().map(Self::ReadHoldingFloats)
                } else if let Some(sfx) = other.strip_prefix("fc4") {
                    sfx.parse().map(Self::ReadInputFloats)
                } else {
                    Err(format!("unknown command: {other}"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_parse() {
        assert_eq!("fc3".parse::<CommandKind>(), Ok(CommandKind::ReadHolding));
        assert_eq!("fc15".parse::<CommandKind>(), Ok(CommandKind::WriteCoils));
        assert_eq!("exit".parse::<CommandKind>(), Ok(CommandKind::Exit));
    }

    #[test]
    fn float_suffixes_parse() {
        assert_eq!(
            "fc3b".parse::<CommandKind>(),
            Ok(CommandKind::ReadHoldingFloats(ByteOrder::BigBig))
        );
        assert_eq!(
            "fc4lb".parse::<CommandKind>(),
            Ok(CommandKind::ReadInputFloats(ByteOrder::LittleLittle))
        );
        assert_eq!(
            "fc16bb".parse::<CommandKind>(),
            Ok(CommandKind::WriteFloats(ByteOrder::BigLittle))
        );
    }

    #[test]
    fn junk_does_not_parse() {
        assert!("fc7".parse::<CommandKind>().is_err());
        assert!("fc3x".parse::<CommandKind>().is_err());
        assert!("read".parse::<CommandKind>().is_err());
        assert!("".parse::<CommandKind>().is_err());
    }
}

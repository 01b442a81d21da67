//! Decode the scp command the client asked the server to run.

use crate::error::ProtocolError;

const PROGRAM: &str = "scp";

/// Direction of an scp transfer, named from the server's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `scp -f`: the server sends files to the client
    CopyToClient,
    /// `scp -t`: the client sends files to the server
    CopyFromClient,
}

/// What the session's command line asks for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferInfo {
    /// The command is an scp invocation at all
    pub ok: bool,
    pub recursive: bool,
    /// Server-side target path
    pub path: String,
    pub op: Option<Op>,
}

impl TransferInfo {
    /// Decode an argv without judging it.
    pub fn decode<S: AsRef<str>>(argv: &[S]) -> Self {
        let mut info = Self::default();
        let args: Vec<&str> = argv.iter().map(|arg| AsRef::<str>::as_ref(arg)).collect();
        let Some((&program, rest)) = args.split_first() else {
            return info;
        };
        if program != PROGRAM {
            return info;
        }

        // The path is the first operand after `-t`/`-f`; flags are never
        // taken as the path, and `--` makes the next token an operand.
        let mut operand_follows = false;
        for &arg in rest {
            if operand_follows || !arg.starts_with('-') {
                operand_follows = false;
                if info.op.is_some() && info.path.is_empty() {
                    info.path = arg.to_string();
                }
                continue;
            }
            match arg {
                "-r" => info.recursive = true,
                "-f" => info.op = Some(Op::CopyToClient),
                "-t" => info.op = Some(Op::CopyFromClient),
                "--" => operand_follows = true,
                _ => {}
            }
        }

        info.ok = true;
        info
    }

    /// Reject every mode except a flat copy into the server.
    pub fn validate(&self, domain: &str) -> Result<(), ProtocolError> {
        if self.recursive {
            return Err(ProtocolError::Recursive {
                domain: domain.to_string(),
            });
        }
        match self.op {
            Some(Op::CopyFromClient) => Ok(()),
            Some(Op::CopyToClient) => Err(ProtocolError::CopyToClient),
            None => Err(ProtocolError::MissingOperation),
        }
    }
}

/// Parse and validate a session command.
///
/// Returns `Ok(None)` when the command is not scp at all, so the caller can
/// hand the session to something else.
pub fn parse_command<S: AsRef<str>>(
    argv: &[S],
    domain: &str,
) -> Result<Option<TransferInfo>, ProtocolError> {
    let info = TransferInfo::decode(argv);
    if !info.ok {
        return Ok(None);
    }
    info.validate(domain)?;
    Ok(Some(info))
}

/// Split an `SSH_ORIGINAL_COMMAND` string into argv.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

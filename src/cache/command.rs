//! Backend-neutral Redis command.

/// A single Redis command with binary-safe arguments.
///
/// Nodes translate it into a `redis::Cmd`; the in-memory test node
/// interprets it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    args: Vec<Vec<u8>>,
}

impl Command {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(arg.as_ref().to_vec());
        self
    }

    pub fn int_arg(self, arg: i64) -> Self {
        self.arg(arg.to_string())
    }

    pub fn args_from<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_vec()));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// First argument, which is the key for every command issued here.
    pub fn key(&self) -> String {
        self.args
            .first()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .unwrap_or_default()
    }

    pub(crate) fn to_redis(&self) -> redis::Cmd {
        let mut cmd = redis::cmd(self.name);
        for arg in &self.args {
            cmd.arg(arg.as_slice());
        }
        cmd
    }
}

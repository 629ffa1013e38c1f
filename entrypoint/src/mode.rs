use std::fmt;

/// Service role selected by the single positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Api,
  Worker,
  Beat,
  Flower,
}

impl Mode {
  pub const ALL: [Mode; 4] = [Mode::Api, Mode::Worker, Mode::Beat, Mode::Flower];

  pub fn as_str(self) -> &'static str {
    match self {
      Mode::Api => "api",
      Mode::Worker => "worker",
      Mode::Beat => "beat",
      Mode::Flower => "flower",
    }
  }

  /// Absent and empty tokens select the API role.
  pub fn parse(token: Option<&str>) -> anyhow::Result<Self> {
    let token = match token {
      None | Some("") => return Ok(Mode::Api),
      Some(t) => t,
    };

    Mode::ALL
      .into_iter()
      .find(|m| m.as_str() == token)
      .ok_or_else(|| anyhow::anyhow!("invalid mode '{token}'; valid modes: {}", valid_modes()))
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

pub fn valid_modes() -> String {
  Mode::ALL.map(Mode::as_str).join(", ")
}

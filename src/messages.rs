/// Commands accepted from the control surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Arm the loop on the named device, or the configured one
    Start(Option<String>),
    Stop,
    Devices,
    Status,
    Quit,
}

impl ControlCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match verb.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start((!rest.is_empty()).then(|| rest.to_string()))),
            "stop" => Some(Self::Stop),
            "devices" | "refresh" => Some(Self::Devices),
            "status" => Some(Self::Status),
            "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

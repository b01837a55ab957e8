//! pfctl(8) backend.
//!
//! Each service gets the anchor `<anchor>/<service>` holding one table named
//! after the service and one redirection rule pointing at it.

use std::io::Write;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::filter::{FilterError, FilterTarget, PacketFilter};

#[derive(Debug)]
pub struct Pfctl {
    program: PathBuf,
    anchor: String,
}

impl Pfctl {
    pub fn new(program: PathBuf, anchor: String) -> Self {
        Self { program, anchor }
    }

    pub fn anchor_for(&self, target: &FilterTarget) -> String {
        format!("{}/{}", self.anchor, target.service)
    }

    /// The redirection rule loaded while a service is up.
    pub fn rdr_rule(target: &FilterTarget) -> String {
        format!(
            "pass in quick proto {} from any to {} port {} rdr-to <{}> port {} round-robin\n",
            target.protocol, target.address, target.port, target.service, target.target_port
        )
    }

    fn table_args(&self, target: &FilterTarget, command: &str) -> Vec<String> {
        vec![
            "-q".to_string(),
            "-a".to_string(),
            self.anchor_for(target),
            "-t".to_string(),
            target.service.clone(),
            "-T".to_string(),
            command.to_string(),
        ]
    }

    fn run(&self, args: &[String], input: Option<&str>) -> Result<(), FilterError> {
        let program = self.program.display().to_string();
        let command = format!("{} {}", program, args.join(" "));
        tracing::debug!(%command, "Running pfctl");

        let spawn_error = |source: std::io::Error| FilterError::Spawn { program: program.clone(), source };
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let (Some(text), Some(mut stdin)) = (input, child.stdin.take()) {
            // pfctl may exit before reading stdin; the exit status is checked below
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(spawn_error(e));
                }
            }
        }

        let output = child.wait_with_output().map_err(spawn_error)?;
        if !output.status.success() {
            return Err(FilterError::Command {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl PacketFilter for Pfctl {
    fn add_host(&mut self, target: &FilterTarget, address: IpAddr) -> Result<(), FilterError> {
        let mut args = self.table_args(target, "add");
        args.push(address.to_string());
        self.run(&args, None)
    }

    fn remove_host(&mut self, target: &FilterTarget, address: IpAddr) -> Result<(), FilterError> {
        let mut args = self.table_args(target, "delete");
        args.push(address.to_string());
        self.run(&args, None)
    }

    fn flush_table(&mut self, target: &FilterTarget) -> Result<(), FilterError> {
        let args = self.table_args(target, "flush");
        self.run(&args, None)
    }

    fn activate_ruleset(&mut self, target: &FilterTarget) -> Result<(), FilterError> {
        let args = vec!["-q".to_string(), "-a".to_string(), self.anchor_for(target), "-f".to_string(), "-".to_string()];
        self.run(&args, Some(&Self::rdr_rule(target)))
    }

    fn deactivate_ruleset(&mut self, target: &FilterTarget) -> Result<(), FilterError> {
        let args = vec!["-q".to_string(), "-a".to_string(), self.anchor_for(target), "-F".to_string(), "rules".to_string()];
        self.run(&args, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Protocol;

    fn target() -> FilterTarget {
        FilterTarget {
            service: "www".into(),
            address: "192.0.2.10".parse().unwrap(),
            port: 80,
            protocol: Protocol::Tcp,
            target_port: 8080,
        }
    }

    #[test]
    fn test_rdr_rule() {
        assert_eq!(
            Pfctl::rdr_rule(&target()),
            "pass in quick proto tcp from any to 192.0.2.10 port 80 rdr-to <www> port 8080 round-robin\n"
        );
    }

    #[test]
    fn test_anchor_per_service() {
        let pf = Pfctl::new("/sbin/pfctl".into(), "hoststated".into());
        assert_eq!(pf.anchor_for(&target()), "hoststated/www");
        assert_eq!(
            pf.table_args(&target(), "flush"),
            vec!["-q", "-a", "hoststated/www", "-t", "www", "-T", "flush"]
        );
    }

    #[test]
    fn test_exit_status_is_reported() {
        let mut ok = Pfctl::new("true".into(), "hoststated".into());
        assert!(ok.flush_table(&target()).is_ok());
        assert!(ok.add_host(&target(), "10.0.0.1".parse().unwrap()).is_ok());

        let mut failing = Pfctl::new("false".into(), "hoststated".into());
        let err = failing.flush_table(&target()).unwrap_err();
        assert!(matches!(err, FilterError::Command { .. }));

        let mut missing = Pfctl::new("/nonexistent/pfctl".into(), "hoststated".into());
        assert!(matches!(missing.flush_table(&target()), Err(FilterError::Spawn { .. })));
    }
}

//! Output formatting for certificate listings.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use trustkeep_core::Certificate;

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable, colored
    #[default]
    Pretty,
    /// JSON output
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "table" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!(
                "Unknown output format: {}\n\
                 Valid formats: pretty, json",
                s
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Serializable view of one certificate.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateRow {
    pub fingerprint: String,
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl From<&Certificate> for CertificateRow {
    fn from(cert: &Certificate) -> Self {
        Self {
            fingerprint: cert.fingerprint().to_string(),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: hex::encode_upper(cert.serial()),
            not_before: cert.not_before(),
            not_after: cert.not_after(),
        }
    }
}

/// Print a certificate list in the requested format.
pub fn print_certificates(certs: &[Certificate], format: OutputFormat) -> anyhow::Result<()> {
    let rows: Vec<CertificateRow> = certs.iter().map(CertificateRow::from).collect();
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Pretty => {
            let now = Utc::now();
            for row in &rows {
                println!("{}", row.subject.bold());
                println!("  {} {}", "SHA1:".dimmed(), row.fingerprint.cyan());
                println!("  {} {}", "Issuer:".dimmed(), row.issuer);
                println!("  {} {}", "Serial:".dimmed(), row.serial);
                let expiry = row.not_after.format("%Y-%m-%d").to_string();
                if row.not_after < now {
                    println!("  {} {}", "Expires:".dimmed(), expiry.red());
                } else {
                    println!("  {} {}", "Expires:".dimmed(), expiry);
                }
            }
            println!();
            println!("{} {}", "Trusted:".bold(), rows.len().to_string().cyan().bold());
        }
    }
    Ok(())
}

/// Print only the number of certificates.
pub fn print_count(count: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "count": count })),
        OutputFormat::Pretty => println!("{count}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_row_serial_is_upper_hex() {
        let key_pair = rcgen::KeyPair::generate().unwrap();
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        params.serial_number = Some(rcgen::SerialNumber::from_slice(&[0x01, 0xAB]));
        let cert = params.self_signed(&key_pair).unwrap();
        let cert = Certificate::from_der(cert.der()).unwrap();

        let row = CertificateRow::from(&cert);
        assert_eq!(row.serial, "01AB");
        assert_eq!(row.fingerprint, cert.fingerprint().to_string());
    }
}

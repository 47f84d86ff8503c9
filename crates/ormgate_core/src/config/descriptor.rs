//! Per-kind connection descriptor strategies.
//!
//! Each database kind maps to a pure function from parameters to a
//! descriptor, so connection-string shapes can be tested without any
//! database being reachable.

use super::{ConnectParams, DatabaseKind};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Path literal selecting a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

const PASSWORD_MASK: &str = "***";

/// Where and how a runtime should connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionDescriptor {
    /// Network database addressed by an ADO-style connection string.
    Network {
        connection_string: String,
        password: String,
    },
    /// File-based database.
    File { path: PathBuf },
    /// In-memory database living as long as its session factory.
    Memory,
}

impl ConnectionDescriptor {
    /// Descriptor text with the password masked; safe for logs.
    pub fn redacted(&self) -> String {
        match self {
            Self::Network {
                connection_string,
                password,
            } => {
                if password.is_empty() {
                    connection_string.clone()
                } else {
                    connection_string.replace(
                        &format!("Password={password};"),
                        &format!("Password={PASSWORD_MASK};"),
                    )
                }
            }
            Self::File { path } => format!("file:{}", path.display()),
            Self::Memory => "memory".to_string(),
        }
    }
}

impl Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Strategy signature: parameters in, descriptor out.
pub type DescriptorFn = fn(&ConnectParams) -> ConnectionDescriptor;

const DESCRIPTOR_STRATEGIES: &[(DatabaseKind, DescriptorFn)] = &[
    (DatabaseKind::MySql, server_port_descriptor),
    (DatabaseKind::PostgreSql, server_port_descriptor),
    (DatabaseKind::Sqlite, file_descriptor),
    (DatabaseKind::SqlServer2008, sql_server_descriptor),
    (DatabaseKind::Oracle10, oracle_descriptor),
];

/// Returns the descriptor strategy registered for `kind`.
pub fn descriptor_strategy(kind: DatabaseKind) -> DescriptorFn {
    DESCRIPTOR_STRATEGIES
        .iter()
        .find(|(candidate, _)| *candidate == kind)
        .map_or(server_port_descriptor, |(_, strategy)| *strategy)
}

/// Builds the descriptor for `params` using its kind's strategy.
pub fn build_descriptor(params: &ConnectParams) -> ConnectionDescriptor {
    descriptor_strategy(params.kind)(params)
}

fn server_port_descriptor(params: &ConnectParams) -> ConnectionDescriptor {
    ConnectionDescriptor::Network {
        connection_string: format!(
            "Server={}; Port={}; Database={}; User ID={}; Password={};",
            params.server, params.port, params.database, params.username, params.password
        ),
        password: params.password.clone(),
    }
}

fn sql_server_descriptor(params: &ConnectParams) -> ConnectionDescriptor {
    ConnectionDescriptor::Network {
        connection_string: format!(
            "Data Source={}; User Id={}; Password={}; Integrated Security=SSPI;",
            params.server, params.username, params.password
        ),
        password: params.password.clone(),
    }
}

fn oracle_descriptor(params: &ConnectParams) -> ConnectionDescriptor {
    ConnectionDescriptor::Network {
        connection_string: format!(
            "Data Source={}; Database={}; User Id={}; Password={}; Integrated Security=SSPI;",
            params.server, params.database, params.username, params.password
        ),
        password: params.password.clone(),
    }
}

fn file_descriptor(params: &ConnectParams) -> ConnectionDescriptor {
    let database = params.database.trim();
    if database == IN_MEMORY_PATH {
        ConnectionDescriptor::Memory
    } else {
        ConnectionDescriptor::File {
            path: PathBuf::from(database),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{build_descriptor, ConnectionDescriptor};
    use crate::config::{ConnectParams, DatabaseKind};
    use std::path::PathBuf;

    fn params(kind: DatabaseKind) -> ConnectParams {
        ConnectParams::new(kind, "db01", 5432, "erp", "app", "s3cret")
    }

    fn connection_string(descriptor: ConnectionDescriptor) -> String {
        match descriptor {
            ConnectionDescriptor::Network {
                connection_string, ..
            } => connection_string,
            other => panic!("expected network descriptor, got {other:?}"),
        }
    }

    #[test]
    fn mysql_and_postgres_share_server_port_shape() {
        let expected = "Server=db01; Port=5432; Database=erp; User ID=app; Password=s3cret;";
        assert_eq!(
            connection_string(build_descriptor(&params(DatabaseKind::MySql))),
            expected
        );
        assert_eq!(
            connection_string(build_descriptor(&params(DatabaseKind::PostgreSql))),
            expected
        );
    }

    #[test]
    fn sql_server_omits_port_and_database() {
        assert_eq!(
            connection_string(build_descriptor(&params(DatabaseKind::SqlServer2008))),
            "Data Source=db01; User Id=app; Password=s3cret; Integrated Security=SSPI;"
        );
    }

    #[test]
    fn oracle_includes_database() {
        assert_eq!(
            connection_string(build_descriptor(&params(DatabaseKind::Oracle10))),
            "Data Source=db01; Database=erp; User Id=app; Password=s3cret; Integrated Security=SSPI;"
        );
    }

    #[test]
    fn sqlite_uses_database_as_path() {
        assert_eq!(
            build_descriptor(&ConnectParams::sqlite("/var/lib/app.db")),
            ConnectionDescriptor::File {
                path: PathBuf::from("/var/lib/app.db")
            }
        );
        assert_eq!(
            build_descriptor(&ConnectParams::sqlite(":memory:")),
            ConnectionDescriptor::Memory
        );
    }

    #[test]
    fn redacted_form_masks_password() {
        for kind in [
            DatabaseKind::MySql,
            DatabaseKind::PostgreSql,
            DatabaseKind::SqlServer2008,
            DatabaseKind::Oracle10,
        ] {
            let descriptor = build_descriptor(&params(kind));
            let redacted = descriptor.redacted();
            assert!(!redacted.contains("s3cret"), "{kind}: {redacted}");
            assert!(redacted.contains("Password=***;"));
            assert_eq!(descriptor.to_string(), redacted);
        }
    }
}

#[cfg(test)]
pub mod test {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    use crate::record::{Describe, EnumDef, FieldConverter, Fields, Record, TypeExpr};
    use crate::value::{Mapping, Value};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct TestConfig {
        pub host: String,
        pub port: u16,
        pub debug: bool,
        pub mode: Mode,
        pub tags: Vec<String>,
        pub database: TestDbConfig,
        pub limits: BTreeMap<String, u32>,
    }

    impl Record for TestConfig {
        const NAME: &'static str = "TestConfig";

        fn describe(fields: &mut Fields) {
            fields.field::<String>("host").default("localhost");
            fields.field::<u16>("port").default(8080);
            fields.field::<bool>("debug").default(false);
            fields.field::<Mode>("mode").default("fast");
            fields
                .field::<Vec<String>>("tags")
                .default_with(|| Value::Sequence(Vec::new()));
            fields
                .field::<TestDbConfig>("database")
                .default(Mapping::new());
            fields
                .field::<BTreeMap<String, u32>>("limits")
                .default(Mapping::new());
        }
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct TestDbConfig {
        pub url: Option<String>,
        pub pool_size: usize,
    }

    impl Record for TestDbConfig {
        const NAME: &'static str = "TestDbConfig";

        fn describe(fields: &mut Fields) {
            fields.field::<Option<String>>("url").default(Value::Null);
            fields.field::<usize>("pool_size").default(5);
        }
    }

    #[test]
    fn test_config_loads_defaults() {
        let registry = crate::SchemaRegistry::new();
        let config: TestConfig = crate::Converter::new(&registry)
            .from_mapping_of::<TestConfig>(Mapping::new())
            .unwrap()
            .into_typed()
            .unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.mode, Mode::Fast);
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.pool_size, 5);
    }

    // -- Server fixture with a required field ------------------------------------

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
    }

    impl Record for ServerConfig {
        const NAME: &'static str = "ServerConfig";

        fn describe(fields: &mut Fields) {
            fields.field::<String>("host").default("localhost");
            fields.field::<u16>("port");
        }
    }

    // -- Enums --------------------------------------------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum Mode {
        Fast,
        Slow,
    }

    impl Describe for Mode {
        fn type_expr() -> TypeExpr {
            TypeExpr::Enum(
                EnumDef::new::<Mode>("Mode")
                    .member("FAST", "fast")
                    .member("SLOW", "slow"),
            )
        }
    }

    /// Names and values deliberately crossed.
    pub enum Level {}

    impl Describe for Level {
        fn type_expr() -> TypeExpr {
            TypeExpr::Enum(
                EnumDef::new::<Level>("Level")
                    .member("LOW", "high")
                    .member("HIGH", "low"),
            )
        }
    }

    /// Integer-valued members.
    pub enum Priority {}

    impl Describe for Priority {
        fn type_expr() -> TypeExpr {
            TypeExpr::Enum(
                EnumDef::new::<Priority>("Priority")
                    .member("LOW", 1)
                    .member("HIGH", 2),
            )
        }
    }

    /// Field names that are not lowercase.
    pub struct Tuning;

    impl Record for Tuning {
        const NAME: &'static str = "Tuning";

        fn describe(fields: &mut Fields) {
            fields.field::<i64>("maxConn").default(1);
            fields.field::<Priority>("priority").default(1);
            fields.field::<TestDbConfig>("DB").default(Mapping::new());
        }
    }

    // -- Self-referential record -------------------------------------------------

    pub struct Node;

    impl Record for Node {
        const NAME: &'static str = "Node";

        fn describe(fields: &mut Fields) {
            fields.field::<String>("name");
            fields.field::<Option<i64>>("value").default(Value::Null);
            fields
                .field::<Vec<Node>>("children")
                .default_with(|| Value::Sequence(Vec::new()));
        }
    }

    // -- Field flags --------------------------------------------------------------

    pub struct Secret;

    impl Record for Secret {
        const NAME: &'static str = "Secret";

        fn describe(fields: &mut Fields) {
            fields.field::<String>("user");
            fields.field::<String>("token").repr(false).compare(false);
            fields.field::<i64>("created").init(false).default(0);
        }
    }

    pub struct Duplicated;

    impl Record for Duplicated {
        const NAME: &'static str = "Duplicated";

        fn describe(fields: &mut Fields) {
            fields.field::<i64>("value").default(1);
            fields.field::<String>("value");
        }
    }

    // -- Field converters ---------------------------------------------------------

    fn named_color(raw: Value) -> Result<Value, String> {
        let name = raw.as_str().ok_or("not a color name")?;
        let hex = match name.to_ascii_lowercase().as_str() {
            "black" => "#000000",
            "red" => "#ff0000",
            "green" => "#00ff00",
            _ => return Err(format!("unknown color {name}")),
        };
        Ok(Value::from(hex))
    }

    struct Opacity;

    impl FieldConverter for Opacity {
        fn convert(&self, raw: Value) -> Result<Value, String> {
            let value = match &raw {
                Value::Float(f) => *f,
                Value::Integer(i) => *i as f64,
                Value::String(s) => s.trim().parse().map_err(|_| format!("{s:?} is not a number"))?,
                other => return Err(format!("{} is not a number", other.type_name())),
            };
            if (0.0..=1.0).contains(&value) {
                Ok(Value::Float(value))
            } else {
                Err(format!("{value} is outside 0..=1"))
            }
        }

        fn strict(&self) -> bool {
            true
        }
    }

    pub struct Painted;

    impl Record for Painted {
        const NAME: &'static str = "Painted";

        fn describe(fields: &mut Fields) {
            fields.field::<String>("name");
            fields
                .field::<String>("color")
                .default("black")
                .converter(named_color);
            fields
                .field::<Option<f64>>("opacity")
                .default(1.0)
                .converter(Opacity);
        }
    }
}

#[cfg(test)]
pub mod test {
    use confique::Config;
    use serde::{Deserialize, Serialize};

    use crate::tag::{Bind, FieldTag, Tags};

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct TestConfig {
        /// The application host.
        #[config(default = "localhost")]
        pub host: String,

        /// The port number.
        #[config(default = 8080)]
        pub port: u16,

        /// Enable debug mode.
        #[config(default = false)]
        pub debug: bool,

        /// Database settings.
        #[config(nested)]
        pub database: TestDbConfig,
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct TestDbConfig {
        /// Connection string URL.
        pub url: Option<String>,

        /// Connection pool size.
        #[config(default = 5)]
        pub pool_size: usize,
    }

    impl Bind for TestConfig {
        fn tags() -> Tags {
            Tags::from_meta(&TestConfig::META)
        }
    }

    #[test]
    fn test_config_loads_defaults() {
        let config = TestConfig::builder().load().unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.pool_size, 5);
    }

    // -- One field of every supported kind --------------------------------------

    #[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
    pub struct TypesStruct {
        pub string: String,
        pub slice: Vec<String>,
        pub bool: bool,
        pub integer: i32,
        pub untagged: String,
    }

    impl Bind for TypesStruct {
        fn tags() -> Tags {
            Tags::new()
                .field("string", FieldTag::new("string").desc("a string").optional())
                .field("slice", FieldTag::new("slice").desc("a list").optional())
                .field("bool", FieldTag::new("bool").desc("a switch").optional())
                .field("integer", FieldTag::new("integer").short('i').optional())
        }
    }

    // -- One level of nesting -----------------------------------------------------

    #[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
    pub struct Nested {
        pub name: String,
        pub db: Db,
        pub verbose: bool,
    }

    #[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
    pub struct Db {
        pub host: String,
        pub port: u16,
    }

    impl Bind for Nested {
        fn tags() -> Tags {
            Tags::new()
                .field("name", FieldTag::new("name").optional())
                .nested(
                    "db",
                    Tags::new()
                        .field("host", FieldTag::new("db-host").default_value("localhost"))
                        .field("port", FieldTag::new("db-port").default_value("5432")),
                )
                .field("verbose", FieldTag::new("verbose").short('v').optional())
        }
    }

    // -- Two levels of nesting, which registration refuses ------------------------

    #[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
    pub struct NestedTooDeep {
        pub mid: Mid,
    }

    #[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
    pub struct Mid {
        pub inner: Deep,
    }

    #[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
    pub struct Deep {
        pub value: String,
    }

    impl Bind for NestedTooDeep {
        fn tags() -> Tags {
            Tags::new().nested(
                "mid",
                Tags::new().nested("inner", Tags::new().field("value", FieldTag::new("value"))),
            )
        }
    }

    // -- An unsupported kind ------------------------------------------------------

    #[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
    pub struct WithFloat {
        pub ratio: f64,
    }

    impl Bind for WithFloat {
        fn tags() -> Tags {
            Tags::new().field("ratio", FieldTag::new("ratio").default_value("0.5"))
        }
    }
}

//! Environment source: CLAUSECRAFT__SECTION__KEY overrides `section.key`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("CLAUSECRAFT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}

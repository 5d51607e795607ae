use crate::commands::{CommandError, HandlerOutcome};
use crate::config::ServerConfig;
use crate::resp::RespValue;

/// CONFIG GET: only the two keys the boot RDB location is built from.
pub fn config_get(
    config: &ServerConfig,
    arguments: &[String],
) -> Result<HandlerOutcome, CommandError> {
    let [subcommand, parameter] = arguments else {
        return Err(CommandError::WrongArity("config"));
    };

    if subcommand.to_uppercase() != "GET" {
        return Err(CommandError::InvalidArgument(format!(
            "unknown CONFIG subcommand '{}'",
            subcommand
        )));
    }

    let value = match parameter.to_lowercase().as_str() {
        "dir" => config.dir.clone(),
        "dbfilename" => config.dbfilename.clone(),
        _ => {
            return Err(CommandError::InvalidArgument(format!(
                "unknown CONFIG parameter '{}'",
                parameter
            )));
        }
    };

    Ok(HandlerOutcome::reply(
        RespValue::encode_array_from_strings(vec![parameter.to_lowercase(), value]),
    ))
}

//! profile.d scripts sourced before the application starts

use crate::config::KibanaConfig;
use crate::dependency::Dependency;

/// Strip leading whitespace from every line and drop blank lines
pub fn trim_lines(text: &str) -> String {
    text.lines()
        .map(str::trim_start)
        .filter(|line| !line.is_empty())
        .fold(String::new(), |mut out, line| {
            out.push_str(line);
            out.push('\n');
            out
        })
}

/// Script file name for a dependency
pub fn script_name(dependency: &str) -> String {
    format!("{dependency}.sh")
}

/// Export `<VAR>_HOME` for a tool dependency and put it on the PATH
pub fn tool_script(home_var: &str, dependency: &Dependency) -> String {
    trim_lines(&format!(
        "
        export {home_var}=$DEPS_DIR/{location}
        PATH=$PATH:${home_var}
        ",
        location = dependency.runtime_location.display(),
    ))
}

/// Runtime settings for the Kibana start script
pub fn kibana_script(config: &KibanaConfig, deps_idx: &str, kibana: &Dependency) -> String {
    let sleep = if config.buildpack.do_sleep_command {
        "yes"
    } else {
        ""
    };
    trim_lines(&format!(
        "
        export K_BP_RESERVED_MEMORY={reserved}
        export K_BP_HEAP_PERCENTAGE={heap}
        export K_BP_NODE_OPTS={node_opts}
        export K_CMD_ARGS={cmd_args}
        export K_ROOT=$DEPS_DIR/{deps_idx}
        export KIBANA_HOME=$DEPS_DIR/{location}
        export K_DO_SLEEP={sleep}
        PATH=$PATH:$KIBANA_HOME/bin
        ",
        reserved = config.reserved_memory,
        heap = config.heap_percentage,
        node_opts = config.node_opts,
        cmd_args = config.cmd_args,
        location = kibana.runtime_location.display(),
    ))
}

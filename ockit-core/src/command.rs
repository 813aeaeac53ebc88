//! Command-line composition with privacy-aware rendering.
//!
//! [`CommandText`] assembles a literal command line from a command, an
//! optional positional parameter, and an ordered list of [`CommandOption`]s.
//! The target CLIs are order-sensitive, so options render exactly in
//! insertion order. Privacy mode substitutes sensitive values with a fixed
//! marker so a rendered command can be logged safely; once enabled it cannot
//! be turned off again, and it also covers options added later.

use std::fmt;

use crate::platform::SHELL_QUOTE;

/// Marker substituted for sensitive values under privacy mode.
pub const REDACTED: &str = "REDACTED";

// ============================================================================
// Command Option
// ============================================================================

/// A single named option, immutable once constructed.
///
/// `redacted` controls whether the value is hidden under privacy mode
/// (default true); `quoted` wraps the value in the platform shell quote
/// character (default false).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOption {
    name: String,
    value: Option<String>,
    redacted: bool,
    quoted: bool,
}

impl CommandOption {
    pub fn new(
        name: impl Into<String>,
        value: Option<String>,
        redacted: bool,
        quoted: bool,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            redacted,
            quoted,
        }
    }

    /// A bare flag with no value, e.g. `-w`.
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, None, true, false)
    }

    /// A valued option hidden under privacy mode, e.g. `--project p1`.
    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Some(value.into()), true, false)
    }

    /// A valued option that stays visible under privacy mode, e.g. `-o json`.
    pub fn plain(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Some(value.into()), false, false)
    }

    /// A sensitive quoted option, e.g. credentials passed to `login`.
    pub fn secret(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Some(value.into()), true, true)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders this option, honoring privacy mode.
    ///
    /// Under privacy the marker replaces the value only when a value is
    /// present and the option is redacted; otherwise the bare name is
    /// emitted. Without privacy the value renders verbatim, quoted with the
    /// platform quote character when requested.
    pub fn render(&self, privacy: bool) -> String {
        if privacy {
            return match &self.value {
                Some(_) if self.redacted => format!("{} {}", self.name, REDACTED),
                _ => self.name.clone(),
            };
        }
        match &self.value {
            Some(v) if self.quoted => format!("{} {SHELL_QUOTE}{v}{SHELL_QUOTE}", self.name),
            Some(v) => format!("{} {v}", self.name),
            None => self.name.clone(),
        }
    }
}

// ============================================================================
// Command Text
// ============================================================================

/// A composed command line: command, optional positional parameter, and an
/// ordered set of options.
#[derive(Debug, Clone)]
pub struct CommandText {
    command: String,
    parameter: Option<String>,
    options: Vec<CommandOption>,
    privacy: bool,
}

impl CommandText {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            parameter: None,
            options: Vec::new(),
            privacy: false,
        }
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    pub fn with_options(mut self, options: Vec<CommandOption>) -> Self {
        self.options = options;
        self
    }

    /// Appends an option, preserving insertion order. Chainable.
    pub fn add_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Enables privacy mode. Irreversible: passing `false` after it has been
    /// enabled does not turn it back off. Privacy is a persistent mode, so
    /// options added after this call are redacted too.
    pub fn privacy_mode(mut self, on: bool) -> Self {
        self.privacy |= on;
        self
    }

    pub fn is_privacy(&self) -> bool {
        self.privacy
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn options(&self) -> &[CommandOption] {
        &self.options
    }
}

impl fmt::Display for CommandText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        if let Some(parameter) = &self.parameter {
            let shown = if self.privacy { REDACTED } else { parameter };
            write!(f, " {shown}")?;
        }
        for option in &self.options {
            write!(f, " {}", option.render(self.privacy))?;
        }
        Ok(())
    }
}

// ============================================================================
// Verbosity Augmentation
// ============================================================================

/// Appends `-v <level>` to a command when `level > 0`.
///
/// Verbose-aware constructors (creation, push, watch, storage-create,
/// application-list) are wrapped by callers that hold the configured output
/// verbosity, keeping the builders themselves free of ambient configuration.
pub fn with_verbosity(command: CommandText, level: u32) -> CommandText {
    if level > 0 {
        command.add_option(CommandOption::plain("-v", level.to_string()))
    } else {
        command
    }
}

// ============================================================================
// Command Factory
// ============================================================================

/// Builders for the odo and oc command lines the executor runs.
pub struct Command;

impl Command {
    pub fn view_env() -> CommandText {
        CommandText::new("odo env view").add_option(CommandOption::plain("-o", "json"))
    }

    pub fn list_projects() -> CommandText {
        CommandText::new("odo project list -o json")
    }

    pub fn list_applications(project: &str) -> CommandText {
        CommandText::new("odo application list")
            .add_option(CommandOption::value("--project", project))
            .add_option(CommandOption::plain("-o", "json"))
    }

    pub fn create_project(name: &str) -> CommandText {
        CommandText::new("odo project create")
            .with_parameter(name)
            .add_option(CommandOption::flag("-w"))
    }

    pub fn delete_project(name: &str) -> CommandText {
        CommandText::new("odo project delete")
            .with_parameter(name)
            .add_option(CommandOption::flag("-w"))
            .add_option(CommandOption::plain("-o", "json"))
    }

    pub fn list_components(project: &str, app: &str) -> CommandText {
        CommandText::new("odo list")
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--project", project))
            .add_option(CommandOption::plain("-o", "json"))
    }

    pub fn list_catalog_components() -> CommandText {
        CommandText::new("odo catalog list components")
    }

    pub fn list_catalog_components_json() -> CommandText {
        CommandText::new(format!("{} -o json", Self::list_catalog_components()))
    }

    pub fn list_catalog_services() -> CommandText {
        CommandText::new("odo catalog list services")
    }

    pub fn list_catalog_services_json() -> CommandText {
        CommandText::new(format!("{} -o json", Self::list_catalog_services()))
    }

    pub fn list_registries() -> CommandText {
        CommandText::new("odo registry list -o json")
    }

    pub fn print_catalog_component_image_stream_ref_json(
        name: &str,
        namespace: &str,
    ) -> CommandText {
        CommandText::new("oc get imagestream")
            .with_parameter(name)
            .add_option(CommandOption::value("-n", namespace))
            .add_option(CommandOption::plain("-o", "json"))
    }

    pub fn list_storage_names() -> CommandText {
        CommandText::new("odo storage list -o json")
    }

    pub fn list_service_instances(project: &str, app: &str) -> CommandText {
        CommandText::new("odo service list")
            .add_option(CommandOption::plain("-o", "json"))
            .add_option(CommandOption::value("--project", project))
            .add_option(CommandOption::value("--app", app))
    }

    pub fn describe_application(project: &str, app: &str) -> CommandText {
        CommandText::new("odo app describe")
            .with_parameter(app)
            .add_option(CommandOption::value("--project", project))
    }

    pub fn delete_application(project: &str, app: &str) -> CommandText {
        CommandText::new("odo app delete")
            .with_parameter(app)
            .add_option(CommandOption::value("--project", project))
            .add_option(CommandOption::flag("-f"))
    }

    pub fn print_odo_version() -> CommandText {
        CommandText::new("odo version")
    }

    pub fn print_oc_version() -> CommandText {
        CommandText::new("oc version")
    }

    pub fn odo_logout() -> CommandText {
        CommandText::new("odo logout")
    }

    pub fn set_openshift_context(context: &str) -> CommandText {
        CommandText::new("oc config use-context").with_parameter(context)
    }

    pub fn odo_login_with_username_password(
        cluster_url: &str,
        username: &str,
        password: &str,
    ) -> CommandText {
        CommandText::new("odo login")
            .with_parameter(cluster_url)
            .add_option(CommandOption::secret("-u", username))
            .add_option(CommandOption::secret("-p", password))
            .add_option(CommandOption::flag("--insecure-skip-tls-verify"))
    }

    pub fn odo_login_with_token(cluster_url: &str, token: &str) -> CommandText {
        CommandText::new("odo login")
            .with_parameter(cluster_url)
            .add_option(CommandOption::value("--token", token))
            .add_option(CommandOption::flag("--insecure-skip-tls-verify"))
    }

    pub fn create_storage(name: &str, mount_path: &str, size: &str) -> CommandText {
        CommandText::new("odo storage create")
            .with_parameter(name)
            .add_option(CommandOption::value("--path", mount_path))
            .add_option(CommandOption::value("--size", size))
    }

    pub fn delete_storage(storage: &str) -> CommandText {
        CommandText::new("odo storage delete")
            .with_parameter(storage)
            .add_option(CommandOption::flag("-f"))
    }

    pub fn describe_storage(storage: &str) -> CommandText {
        CommandText::new("odo storage describe").with_parameter(storage)
    }

    pub fn wait_for_storage_to_be_gone(project: &str, app: &str, storage: &str) -> CommandText {
        CommandText::new("oc wait")
            .with_parameter(format!("pvc/{storage}-{app}-pvc"))
            .add_option(CommandOption::flag("--for=delete"))
            .add_option(CommandOption::value("--namespace", project))
    }

    pub fn undeploy_component(project: &str, app: &str, component: &str) -> CommandText {
        CommandText::new("odo delete")
            .with_parameter(component)
            .add_option(CommandOption::flag("-f"))
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--project", project))
    }

    pub fn delete_component(project: &str, app: &str, component: &str, s2i: bool) -> CommandText {
        let command = CommandText::new("odo delete")
            .with_parameter(component)
            .add_option(CommandOption::flag("-f"))
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--project", project))
            .add_option(CommandOption::flag("--all"));
        if s2i {
            command.add_option(CommandOption::flag("--s2i"))
        } else {
            command
        }
    }

    pub fn describe_component(project: &str, app: &str, component: &str) -> CommandText {
        CommandText::new("odo describe")
            .with_parameter(component)
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--project", project))
    }

    pub fn describe_component_json(project: &str, app: &str, component: &str) -> CommandText {
        Self::describe_component(project, app, component)
            .add_option(CommandOption::plain("-o", "json"))
    }

    pub fn describe_service(service: &str) -> CommandText {
        CommandText::new("odo catalog describe service").with_parameter(service)
    }

    pub fn describe_catalog_component(component: &str) -> CommandText {
        CommandText::new("odo catalog describe component")
            .with_parameter(component)
            .add_option(CommandOption::plain("-o", "json"))
    }

    pub fn describe_url(url: &str) -> CommandText {
        CommandText::new("odo url describe").with_parameter(url)
    }

    pub fn show_log() -> CommandText {
        CommandText::new("odo log")
    }

    pub fn show_log_and_follow() -> CommandText {
        Self::show_log().add_option(CommandOption::flag("-f"))
    }

    pub fn link_component_to(
        project: &str,
        app: &str,
        component: &str,
        component_to_link: &str,
        port: Option<&str>,
    ) -> CommandText {
        let command = CommandText::new("odo link")
            .with_parameter(component_to_link)
            .add_option(CommandOption::value("--project", project))
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--component", component))
            .add_option(CommandOption::flag("--wait"));
        match port {
            Some(port) => command.add_option(CommandOption::value("--port", port)),
            None => command,
        }
    }

    pub fn link_service_to(
        project: &str,
        app: &str,
        component: &str,
        service_to_link: &str,
    ) -> CommandText {
        CommandText::new("odo link")
            .with_parameter(service_to_link)
            .add_option(CommandOption::value("--project", project))
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--component", component))
            .add_option(CommandOption::flag("--wait"))
            .add_option(CommandOption::flag("--wait-for-target"))
    }

    pub fn unlink_components(
        project: &str,
        app: &str,
        component: &str,
        component_to_unlink: &str,
        port: &str,
    ) -> CommandText {
        CommandText::new("odo unlink")
            .with_parameter(component_to_unlink)
            .add_option(CommandOption::value("--project", project))
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--port", port))
            .add_option(CommandOption::value("--component", component))
    }

    pub fn unlink_service(project: &str, app: &str, service: &str, component: &str) -> CommandText {
        CommandText::new("odo unlink")
            .with_parameter(service)
            .add_option(CommandOption::value("--project", project))
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--component", component))
    }

    pub fn list_component_ports(project: &str, app: &str, component: &str) -> CommandText {
        CommandText::new("oc get service")
            .with_parameter(format!("{component}-{app}"))
            .add_option(CommandOption::value("--namespace", project))
            .add_option(CommandOption::value(
                "-o",
                "jsonpath=\"{range .spec.ports[*]}{.port}{','}{end}\"",
            ))
    }

    pub fn push_component(config_only: bool, debug: bool) -> CommandText {
        let mut command = CommandText::new("odo push");
        if debug {
            command = command.add_option(CommandOption::flag("--debug"));
        }
        if config_only {
            command = command.add_option(CommandOption::flag("--config"));
        }
        command
    }

    pub fn watch_component() -> CommandText {
        CommandText::new("odo watch")
    }

    pub fn test_component() -> CommandText {
        CommandText::new("odo test --show-log")
    }

    pub fn create_local_component(
        project: &str,
        app: &str,
        component_type: &str,
        version: Option<&str>,
        name: &str,
        folder: &str,
        starter: Option<&str>,
        use_existing_devfile: bool,
    ) -> CommandText {
        let mut command = CommandText::new("odo create")
            .with_parameter(component_parameter(component_type, version, name));
        if version.is_some() {
            command = command.add_option(CommandOption::flag("--s2i"));
        }
        command = command
            .add_option(CommandOption::value("--context", folder))
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--project", project));
        if let Some(starter) = starter {
            command = command.add_option(CommandOption::plain("--starter", starter));
        }
        if use_existing_devfile {
            command = command.add_option(CommandOption::value("--devfile", "devfile.yaml"));
        }
        command
    }

    pub fn create_git_component(
        project: &str,
        app: &str,
        component_type: &str,
        version: Option<&str>,
        name: &str,
        git: &str,
        reference: &str,
    ) -> CommandText {
        let mut command = CommandText::new("odo create")
            .with_parameter(component_parameter(component_type, version, name));
        if version.is_some() {
            command = command.add_option(CommandOption::flag("--s2i"));
        }
        command
            .add_option(CommandOption::value("--git", git))
            .add_option(CommandOption::value("--ref", reference))
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--project", project))
    }

    pub fn create_binary_component(
        project: &str,
        app: &str,
        component_type: &str,
        version: Option<&str>,
        name: &str,
        binary: &str,
        context: &str,
    ) -> CommandText {
        let mut command = CommandText::new("odo create")
            .with_parameter(component_parameter(component_type, version, name));
        if version.is_some() {
            command = command.add_option(CommandOption::flag("--s2i"));
        }
        command
            .add_option(CommandOption::value("--binary", binary))
            .add_option(CommandOption::value("--context", context))
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--project", project))
    }

    pub fn create_service(
        project: &str,
        app: &str,
        template: &str,
        plan: &str,
        name: &str,
    ) -> CommandText {
        CommandText::new("odo service create")
            .with_parameter(format!("{template} {name}"))
            .add_option(CommandOption::value("--plan", plan))
            .add_option(CommandOption::value("--app", app))
            .add_option(CommandOption::value("--project", project))
            .add_option(CommandOption::flag("-w"))
    }

    pub fn delete_service(project: &str, app: &str, name: &str) -> CommandText {
        CommandText::new("odo service delete")
            .with_parameter(name)
            .add_option(CommandOption::flag("-f"))
            .add_option(CommandOption::value("--project", project))
            .add_option(CommandOption::value("--app", app))
    }

    pub fn get_service_template(project: &str, service: &str) -> CommandText {
        CommandText::new("oc get ServiceInstance")
            .with_parameter(service)
            .add_option(CommandOption::value("--namespace", project))
            .add_option(CommandOption::value(
                "-o",
                "jsonpath=\"{$.metadata.labels.app\\.kubernetes\\.io/name}\"",
            ))
    }

    pub fn wait_for_service_to_be_gone(project: &str, service: &str) -> CommandText {
        CommandText::new("oc wait")
            .with_parameter(format!("ServiceInstance/{service}"))
            .add_option(CommandOption::value("--for", "delete"))
            .add_option(CommandOption::value("--namespace", project))
    }

    pub fn create_component_custom_url(name: &str, port: &str, secure: bool) -> CommandText {
        let command = CommandText::new("odo url create")
            .with_parameter(name)
            .add_option(CommandOption::value("--port", port));
        if secure {
            command.add_option(CommandOption::flag("--secure"))
        } else {
            command
        }
    }

    pub fn get_component_url() -> CommandText {
        CommandText::new("odo url list -o json")
    }

    pub fn delete_component_url(name: &str) -> CommandText {
        CommandText::new("odo url delete")
            .with_parameter(name)
            .add_option(CommandOption::flag("-f"))
            .add_option(CommandOption::flag("--now"))
    }

    pub fn get_component_json() -> CommandText {
        CommandText::new("odo describe -o json")
    }

    pub fn show_server_url() -> CommandText {
        CommandText::new("oc whoami --show-server")
    }

    pub fn show_console_url() -> CommandText {
        CommandText::new("oc get configmaps console-public -n openshift-config-managed -o json")
    }

    pub fn get_cluster_version() -> CommandText {
        CommandText::new("oc get clusterversion -ojson")
    }
}

/// Builds the `type[:version] name` positional parameter of `odo create`.
fn component_parameter(component_type: &str, version: Option<&str>, name: &str) -> String {
    match version {
        Some(version) => format!("{component_type}:{version} {name}"),
        None => format!("{component_type} {name}"),
    }
}

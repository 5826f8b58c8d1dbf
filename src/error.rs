use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ConnectError {
    #[error("no network interface found")]
    #[diagnostic(
        code(remorch::no_interface),
        help("connect this machine to a network (or start tailscale) and try again")
    )]
    NoInterface,

    #[error("failed to create tmux session '{name}': {message}")]
    #[diagnostic(code(remorch::session), help("check that tmux is installed and on PATH"))]
    SessionCreation { name: String, message: String },

    #[error("could not detect a supported shell from SHELL={shell:?}")]
    #[diagnostic(code(remorch::shell_detection))]
    ShellDetection { shell: String },

    #[error("could not determine the login user name")]
    #[diagnostic(code(remorch::user), help("set USER to the account name used for ssh"))]
    UnknownUser,

    #[error("failed to write to {path}")]
    #[diagnostic(code(remorch::file_write))]
    FileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {path}: {message}")]
    ConfigParse { path: String, message: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("invalid connection payload: {message}")]
    PayloadDecode { message: String },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {message}")]
    ExternalCommand { command: String, message: String },
}

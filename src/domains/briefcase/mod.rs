pub mod checkpoint;
pub mod locator;

pub use checkpoint::{
    briefcase_file_name, print_download_progress, BriefcaseProps, CheckpointRequest, CheckpointService,
    DownloadProgress, HttpCheckpointService,
};
pub use locator::{BriefcaseLocator, ImodelVersion};

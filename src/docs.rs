use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::media::handler::upload_video,
        crate::modules::shader::handler::run_shader,
        crate::modules::shader::handler::stream_logs,
        crate::modules::shader::handler::get_job,
    ),
    components(
        schemas(
            crate::modules::media::dto::UploadResponse,
            crate::modules::shader::dto::RunRequest,
            crate::modules::shader::dto::RunResponse,
            crate::modules::shader::dto::EventMessage,
            crate::modules::shader::dto::JobResponse,
            crate::modules::shader::model::JobState,
        )
    ),
    tags(
        (name = "Media", description = "Source video upload"),
        (name = "Shader", description = "Shader jobs and their live event streams")
    )
)]
pub struct ApiDoc;

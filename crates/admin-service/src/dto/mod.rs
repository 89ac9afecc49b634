//! 请求与响应 DTO

pub mod request;
pub mod response;

pub use request::{
    ActualizarNovedadRequest, AprobarParcialRequest, AsignarProductoRequest,
    CreateProductoRequest, CreateSolicitudRequest, DevolucionRequest, GestionarNovedadRequest,
    LoginRequest, MovimientosQuery, NovedadQuery, ObservacionRequest, PaginationParams,
    ProductoQuery, SolicitudListQuery, UpdateProductoRequest,
};
pub use response::{
    ApiResponse, CreatedResponse, DevolucionDto, InfoDevolucionDto, LoginResponse,
    NovedadGestionadaDto, NovedadListResponse, NovedadRegistradaDto, NovedadResumenDto,
    PageResponse, ProductoCreadoDto, RefreshResponse, SolicitudDetallesDto, SolicitudDto,
    SolicitudListResponse, TransicionDto, UserInfo,
};

/* 📖 # Why an API module in volbrowse_engine?

The api module exposes volume management and browsing over HTTP. ApiService implements
the HttpService trait from volbrowse_base, so the same service runs on RealPal (tiny_http)
and on MockPal in tests.

Routes live under `/api/2.1/unity-catalog/volumes`:
- `POST /volumes`, `GET /volumes` - create and list volumes
- `GET|PATCH|DELETE /volumes/{full_name}` - read, rename or comment, delete
- `POST /volumes/path` - browse a path inside a volume
- `GET /volumes/{full_name}/content?path=` - raw text of a file
*/

mod payload;
mod service;

pub use payload::{BrowseRequest, ErrorResponse};
pub use service::{ApiService, VOLUMES_BASE_PATH};
